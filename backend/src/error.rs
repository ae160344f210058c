//! Error types for the catalog conversion engine.
//!
//! - [`SheetError`] - Reading or writing spreadsheets (CSV / XLSX)
//! - [`HeaderError`] - Header resolution aborted (required columns missing)
//! - [`ProjectionError`] - JSON input that cannot be flattened
//! - [`FilterError`] - Loading the per-NCM attribute table
//! - [`ConversionError`] - Top-level conversion failures
//!
//! Row-level problems are not errors of this kind: they are accumulated as
//! [`crate::diagnostics::RowIssue`] values so one bad row never stops the rest.

use thiserror::Error;

use crate::catalog::Field;
use crate::diagnostics::Diagnostics;

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while reading or writing tabular files.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read or write the file.
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Legacy binary Excel and other formats we do not read.
    #[error("Unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    /// The XLSX container could not be parsed.
    #[error("Invalid XLSX file: {0}")]
    Xlsx(String),

    /// Malformed CSV content.
    #[error("Invalid CSV content: {0}")]
    Csv(#[from] csv::Error),

    /// Writing an XLSX workbook failed.
    #[error("Failed to write XLSX: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// No rows at all.
    #[error("Spreadsheet is empty")]
    Empty,

    /// The first row has no usable header.
    #[error("No headers found in the first row")]
    NoHeaders,
}

// =============================================================================
// Header Errors
// =============================================================================

/// Errors that abort header resolution for a sheet.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Required columns absent and no default supplied.
    #[error("Required columns not found: {}", join_fields(.0))]
    MissingColumns(Vec<Field>),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Projection Errors
// =============================================================================

/// Errors when flattening JSON records back into rows.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Top-level JSON is neither an object nor an array.
    #[error("Expected a product object or an array of products")]
    NotARecordList,

    /// An array element is not an object.
    #[error("Item {0} is not a product object")]
    NotARecord(usize),

    /// JSON syntax error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors loading the per-NCM attribute table.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Cannot read attribute table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid attribute table: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// This is the error returned by [`crate::pipeline::convert_file`]. A
/// conversion never produces partial output: any recorded row error turns
/// the whole call into [`ConversionError::Rejected`].
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Spreadsheet read/write error.
    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Attribute table error.
    #[error("Attribute filter error: {0}")]
    Filter(#[from] FilterError),

    /// JSON input error on the reverse path.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// The spreadsheet has errors; nothing was written.
    #[error("{} error(s) found in the spreadsheet", .0.errors.len())]
    Rejected(Diagnostics),

    /// No product rows after skipping blank lines.
    #[error("No products found in the spreadsheet")]
    NoProducts,

    /// A projected payload failed its JSON schema.
    #[error("Product {index} does not match the output schema: {}", .errors.join("; "))]
    InvalidPayload { index: usize, errors: Vec<String> },

    /// An embedded output schema could not be loaded.
    #[error("Schema error: {0}")]
    Schema(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Output file could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Diagnostics attached to a rejected conversion.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            ConversionError::Rejected(d) => Some(d),
            _ => None,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type SheetResult<T> = Result<T, SheetError>;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

pub type FilterResult<T> = Result<T, FilterError>;

pub type ConversionResult<T> = Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RowIssue;

    #[test]
    fn test_error_conversion_chain() {
        let sheet_err = SheetError::Empty;
        let conv_err: ConversionError = sheet_err.into();
        assert!(conv_err.to_string().contains("empty"));

        let proj_err = ProjectionError::NotARecord(3);
        let conv_err: ConversionError = proj_err.into();
        assert!(conv_err.to_string().contains("Item 3"));
    }

    #[test]
    fn test_missing_columns_format() {
        let err = HeaderError::MissingColumns(vec![Field::Description, Field::HarmonizedCode]);
        assert_eq!(err.to_string(), "Required columns not found: descricao, ncm");
    }

    #[test]
    fn test_rejected_counts_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(RowIssue::new(2, "bad"));
        diagnostics.error(RowIssue::new(3, "worse"));
        diagnostics.warn(RowIssue::general("note"));
        let err = ConversionError::Rejected(diagnostics);
        assert_eq!(err.to_string(), "2 error(s) found in the spreadsheet");
        assert_eq!(err.diagnostics().unwrap().warnings.len(), 1);
    }
}
