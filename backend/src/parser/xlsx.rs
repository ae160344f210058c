//! XLSX reading via calamine. Only the first worksheet is read.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};

use super::{Cell, Sheet, SheetRow};
use crate::error::{SheetError, SheetResult};

/// Parse the first worksheet of an XLSX workbook.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> SheetResult<Sheet> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Xlsx(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::Xlsx("workbook has no worksheets".to_string()))?
        .map_err(|e| SheetError::Xlsx(e.to_string()))?;

    sheet_from_range(&range)
}

fn sheet_from_range(range: &Range<Data>) -> SheetResult<Sheet> {
    // Ranges start at the first used cell, not at A1.
    let (start_row, start_col) = match range.start() {
        Some((row, col)) => (row as usize, col as usize),
        None => return Err(SheetError::Empty),
    };

    let mut rows = range.rows();
    let header_cells = rows.next().ok_or(SheetError::Empty)?;

    let headers: Vec<String> = std::iter::repeat(String::new())
        .take(start_col)
        .chain(header_cells.iter().map(|d| convert_cell(d).to_text()))
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let rows = rows
        .enumerate()
        .map(|(idx, cells)| SheetRow {
            // header is at start_row (0-based), so the first data row is start_row + 2 in 1-based terms
            number: start_row + idx + 2,
            cells: std::iter::repeat(Cell::Empty)
                .take(start_col)
                .chain(cells.iter().map(convert_cell))
                .collect(),
        })
        .collect();

    Ok(Sheet { headers, rows })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cell_types() {
        assert_eq!(convert_cell(&Data::Empty), Cell::Empty);
        assert_eq!(convert_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(convert_cell(&Data::Float(90211010.0)).to_text(), "90211010.0");
        assert_eq!(convert_cell(&Data::Bool(true)), Cell::Bool(true));
        assert_eq!(convert_cell(&Data::Int(7)), Cell::Int(7));
    }

    #[test]
    fn test_garbage_zip_is_an_error() {
        let bytes = b"PK\x03\x04 this is not a workbook";
        assert!(matches!(parse_xlsx_bytes(bytes), Err(SheetError::Xlsx(_))));
    }
}
