//! Sheet output: CSV (semicolon separated) or XLSX, chosen by extension.
//!
//! Every cell is written as text so codes such as `00012345` keep their
//! leading zeros when the file is opened again.

use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::Workbook;

use super::Sheet;
use crate::error::{SheetError, SheetResult};

/// Worksheet name used for generated workbooks.
pub const WORKSHEET_NAME: &str = "PRODUTOS";

/// Write a sheet as `;`-separated CSV.
pub fn write_csv<W: Write>(sheet: &Sheet, writer: W) -> SheetResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(writer);

    csv_writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        csv_writer.write_record(row.cells.iter().map(|c| c.to_text()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a sheet as a single-worksheet XLSX workbook.
pub fn write_xlsx<P: AsRef<Path>>(sheet: &Sheet, path: P) -> SheetResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string(0, column_index(col)?, header)?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| SheetError::Xlsx("too many rows for a worksheet".to_string()))?;
        for (col, cell) in row.cells.iter().enumerate() {
            if cell.is_blank() {
                continue;
            }
            worksheet.write_string(row_num, column_index(col)?, cell.to_text())?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

/// Write to `.xlsx` when the path says so, CSV otherwise.
pub fn write_sheet_file<P: AsRef<Path>>(sheet: &Sheet, path: P) -> SheetResult<()> {
    let path = path.as_ref();
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    if is_xlsx {
        write_xlsx(sheet, path)
    } else {
        let file = std::fs::File::create(path)?;
        write_csv(sheet, std::io::BufWriter::new(file))
    }
}

fn column_index(col: usize) -> SheetResult<u16> {
    u16::try_from(col).map_err(|_| SheetError::Xlsx("too many columns for a worksheet".to_string()))
}
