//! Tabular input: CSV and XLSX into a common [`Sheet`] model.
//!
//! XLSX is recognised by its zip signature and read from the first worksheet.
//! Everything else is treated as CSV with encoding and delimiter
//! auto-detection. No catalog-specific logic here.

pub mod writer;
pub mod xlsx;

use std::path::Path;

use crate::error::{SheetError, SheetResult};

pub use writer::{write_csv, write_sheet_file, write_xlsx};
pub use xlsx::parse_xlsx_bytes;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

// =============================================================================
// Sheet Model
// =============================================================================

/// A single cell value, keeping the native type a spreadsheet reports.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    /// Stringified, trimmed value.
    ///
    /// Whole floats keep a `.0` suffix, the way spreadsheet numbers look
    /// when read as text; the field normalizers strip it.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

/// One data row with its 1-based position in the source sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub number: usize,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    /// Cell at a column, `Empty` when the row is short.
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

/// Header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

/// Source format detected for an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Csv { delimiter: char },
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub sheet: Sheet,
    pub format: SourceFormat,
    /// Detected encoding (always "utf-8" for XLSX)
    pub encoding: String,
}

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Entry Points
// =============================================================================

/// Read a spreadsheet file (XLSX or CSV), sniffing its content.
pub fn read_sheet_file<P: AsRef<Path>>(path: P) -> SheetResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    read_sheet_bytes(&bytes)
}

/// Parse spreadsheet bytes (XLSX or CSV), sniffing their content.
pub fn read_sheet_bytes(bytes: &[u8]) -> SheetResult<ParseResult> {
    if bytes.is_empty() {
        return Err(SheetError::Empty);
    }
    if bytes.starts_with(OLE2_MAGIC) {
        return Err(SheetError::UnsupportedFormat(
            "legacy .xls workbook; open it in Excel and save it as .xlsx".to_string(),
        ));
    }
    if bytes.starts_with(ZIP_MAGIC) {
        let sheet = parse_xlsx_bytes(bytes)?;
        return Ok(ParseResult {
            sheet,
            format: SourceFormat::Xlsx,
            encoding: "utf-8".to_string(),
        });
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let sheet = parse_csv_str(&content, delimiter)?;

    Ok(ParseResult {
        sheet,
        format: SourceFormat::Csv { delimiter },
        encoding,
    })
}

/// Parse CSV text with an explicit delimiter.
///
/// Quoted fields may contain delimiters and newlines. Row numbers follow the
/// physical line where each record starts, so blank lines still count.
pub fn parse_csv_str(content: &str, delimiter: char) -> SheetResult<Sheet> {
    let delimiter = u8::try_from(delimiter).unwrap_or(b';');
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header_record = match records.next() {
        Some(record) => record?,
        None => return Err(SheetError::Empty),
    };
    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        let number = record
            .position()
            .map(|p| physical_line(content, p.byte() as usize))
            .unwrap_or(idx + 2);
        let cells = record.iter().map(|v| Cell::text(v.to_string())).collect();
        rows.push(SheetRow { number, cells });
    }

    Ok(Sheet { headers, rows })
}

/// 1-based line where the record at `offset` starts.
///
/// The reader records a position before skipping blank lines, so the
/// terminators that follow it belong to lines before the record.
fn physical_line(content: &str, offset: usize) -> usize {
    let bytes = content.as_bytes();
    let mut start = offset.min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
        start += 1;
    }
    bytes[..start].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let sheet = parse_csv_str("ncm;denominacao\n90211010;Arco\n30049099;Gel", ';').unwrap();

        assert_eq!(sheet.headers, vec!["ncm", "denominacao"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].number, 2);
        assert_eq!(sheet.rows[0].cell(0).to_text(), "90211010");
        assert_eq!(sheet.rows[1].cell(1).to_text(), "Gel");
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let csv = "codigosInterno;ncm\n\"A1;B2\";90211010";
        let sheet = parse_csv_str(csv, ';').unwrap();
        assert_eq!(sheet.rows[0].cell(0).to_text(), "A1;B2");
    }

    #[test]
    fn test_blank_lines_keep_numbering() {
        let csv = "a;b\n1;2\n\n3;4\n";
        let sheet = parse_csv_str(csv, ';').unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].number, 4);
    }

    #[test]
    fn test_numbering_after_quoted_newline_and_blank_lines() {
        let csv = "a;b\r\n\"x\ny\";2\r\n\r\n\r\n3;4\r\n";
        let sheet = parse_csv_str(csv, ';').unwrap();
        assert_eq!(sheet.rows[0].number, 2);
        assert_eq!(sheet.rows[1].number, 6);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let sheet = parse_csv_str("a;b;c\n1", ';').unwrap();
        assert_eq!(sheet.rows[0].cell(2), &Cell::Empty);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(read_sheet_bytes(b""), Err(SheetError::Empty)));
    }

    #[test]
    fn test_legacy_xls_rejected() {
        let mut bytes = OLE2_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let err = read_sheet_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn test_cell_text_float_artifact() {
        assert_eq!(Cell::Float(90211010.0).to_text(), "90211010.0");
        assert_eq!(Cell::Float(1.5).to_text(), "1.5");
        assert_eq!(Cell::Text("  x ".into()).to_text(), "x");
        assert!(Cell::Text("   ".into()).is_blank());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_auto_parse_csv() {
        let result = read_sheet_bytes("ncm,cnpj\n90211010,25940099".as_bytes()).unwrap();
        assert_eq!(result.format, SourceFormat::Csv { delimiter: ',' });
        assert_eq!(result.sheet.rows.len(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        // "DESCRIÇÃO" in ISO-8859-1
        let bytes: &[u8] = &[0x44, 0x45, 0x53, 0x43, 0x52, 0x49, 0xC7, 0xC3, 0x4F];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "DESCRIÇÃO");
    }
}
