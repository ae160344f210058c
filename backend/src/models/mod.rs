//! Domain models for the catalog mapping engine.
//!
//! This module contains the core data structures used throughout the engine:
//!
//! - [`ProductRecord`] - One validated catalog product
//! - [`ProductCode`] - Server-assigned product code (integer or raw text)
//! - [`AttributeCode`] - `ATT_<digits>` attribute identifier
//! - [`Status`] - Product status (`Ativado` / `Desativado`)
//! - [`OperationMode`] - Import or export (`IMPORTACAO` / `EXPORTACAO`)
//! - [`SimpleAttribute`] / [`MultiValueAttribute`] - Dynamic attribute values
//!
//! Rust names are English; serde renames carry the CATP API wire names.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

static ATTRIBUTE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ATT_\d+$").expect("attribute code pattern is valid"));

// =============================================================================
// Attribute Code
// =============================================================================

/// Identifier of a dynamic product attribute, always `ATT_<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeCode(String);

impl AttributeCode {
    /// Parse an attribute code, uppercasing and trimming the input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if ATTRIBUTE_CODE.is_match(&normalized) {
            Some(Self(normalized))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AttributeCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid attribute code '{}'", value))
    }
}

impl From<AttributeCode> for String {
    fn from(code: AttributeCode) -> Self {
        code.0
    }
}

impl fmt::Display for AttributeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Product Code
// =============================================================================

/// Product code assigned by the catalog server.
///
/// Spreadsheets usually hold an integer, but a non-numeric code is kept as
/// text instead of rejecting the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductCode {
    Number(i64),
    Text(String),
}

impl ProductCode {
    /// Coerce a raw cell value. `"123"` and `"123.0"` become numbers.
    ///
    /// Returns `None` for blank input.
    pub fn coerce(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Self::Number(n));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(Self::Number(f as i64))
            }
            _ => Some(Self::Text(trimmed.to_string())),
        }
    }

    /// Integer value of the code, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    /// Active product (default)
    #[default]
    #[serde(rename = "Ativado")]
    Active,
    /// Deactivated product
    #[serde(rename = "Desativado")]
    Inactive,
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Active, Status::Inactive];

    /// Parse the canonical wire value (exact match).
    pub fn from_canonical(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Ativado",
            Self::Inactive => "Desativado",
        }
    }
}

// =============================================================================
// Operation Mode
// =============================================================================

/// Whether the product is catalogued for import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    #[serde(rename = "IMPORTACAO")]
    Import,
    #[serde(rename = "EXPORTACAO")]
    Export,
}

impl OperationMode {
    pub const ALL: [OperationMode; 2] = [OperationMode::Import, OperationMode::Export];

    /// Parse the canonical wire value, ignoring case.
    pub fn from_canonical(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.into_iter().find(|m| m.as_str() == upper)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "IMPORTACAO",
            Self::Export => "EXPORTACAO",
        }
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Single-valued attribute: `{ "atributo": "ATT_14545", "valor": "82" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleAttribute {
    #[serde(rename = "atributo")]
    pub code: AttributeCode,
    #[serde(rename = "valor")]
    pub value: String,
}

/// Multi-valued attribute: `{ "atributo": "ATT_14556", "valores": ["11", "12"] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiValueAttribute {
    #[serde(rename = "atributo")]
    pub code: AttributeCode,
    #[serde(rename = "valores")]
    pub values: Vec<String>,
}

// =============================================================================
// Product Record
// =============================================================================

/// A validated catalog product, ready for projection.
///
/// Built by the row normalizer; composite attribute lists are carried through
/// untouched and are always empty for spreadsheet input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub code: Option<ProductCode>,
    pub name: String,
    pub description: String,
    pub owner_tax_id: String,
    pub status: Status,
    pub operation_mode: OperationMode,
    /// NCM code, exactly 8 digits.
    pub harmonized_code: String,
    pub internal_codes: Vec<String>,
    pub simple_attributes: Vec<SimpleAttribute>,
    pub multi_value_attributes: Vec<MultiValueAttribute>,
    pub composite_attributes: Vec<Value>,
    pub composite_multi_attributes: Vec<Value>,
    /// Server metadata, only emitted by the full-export projection.
    pub version: Option<String>,
}

impl ProductRecord {
    /// Short label used in warnings (name cut to 50 characters).
    pub fn label(&self) -> String {
        self.name.chars().take(50).collect()
    }

    pub fn has_attribute(&self, code: &AttributeCode) -> bool {
        self.simple_attributes.iter().any(|a| &a.code == code)
            || self.multi_value_attributes.iter().any(|a| &a.code == code)
    }
}
