//! Error and warning accumulation for one conversion call.
//!
//! Each conversion owns a fresh [`Diagnostics`]. Errors drop a row (or, at
//! header time, the whole sheet); warnings are informational and never block
//! output.

use serde::Serialize;
use std::fmt;

/// A problem tied to a spreadsheet row, a product, or the whole sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    /// 1-based sheet row, when the issue comes from a row.
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row {
            write!(f, "Row {}", row)?;
            match (&self.field, &self.value) {
                (Some(field), Some(value)) => {
                    write!(f, ", field '{}' (value '{}')", field, value)?
                }
                (Some(field), None) => write!(f, ", field '{}'", field)?,
                _ => {}
            }
            write!(f, ": {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl RowIssue {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            field: None,
            value: None,
            message: message.into(),
        }
    }

    /// An issue not tied to a row (header or product level).
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            row: None,
            field: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Errors and warnings collected during one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, issue: RowIssue) {
        self.errors.push(issue);
    }

    pub fn warn(&mut self, issue: RowIssue) {
        self.warnings.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
