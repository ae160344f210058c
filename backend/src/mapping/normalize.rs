//! Cell-level normalizers for principal fields and attribute values.
//!
//! Every function takes an already stringified, trimmed cell value and returns
//! the normalized text. None of them validate; the row validator checks the
//! results against the catalog limits.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{Field, HARMONIZED_CODE_LEN};
use crate::parser::Cell;

static MULTI_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;,|\n]+").expect("separator pattern is valid"));

const IMPORT_SYNONYMS: [&str; 4] = ["IMP", "IMPORT", "IMPORTAÇÃO", "IMPORTAÇAO"];
const EXPORT_SYNONYMS: [&str; 4] = ["EXP", "EXPORT", "EXPORTAÇÃO", "EXPORTAÇAO"];

const ACTIVE_TOKENS: [&str; 7] = ["ativo", "ativado", "sim", "s", "1", "true", "yes"];
const INACTIVE_TOKENS: [&str; 8] = ["inativo", "desativado", "não", "nao", "n", "0", "false", "no"];

const TRUE_TOKENS: [&str; 3] = ["TRUE", "VERDADEIRO", "SIM"];
const FALSE_TOKENS: [&str; 4] = ["FALSE", "FALSO", "NÃO", "NAO"];

/// Drop the `.0` a spreadsheet adds when it stores a code as a float.
pub fn strip_float_suffix(value: &str) -> &str {
    value.strip_suffix(".0").unwrap_or(value)
}

/// NCM: float suffix removed, punctuation stripped, left-padded to 8 digits.
///
/// Blank input stays blank so the required-field check can report it.
pub fn harmonized_code(raw: &str) -> String {
    let cleaned: String = strip_float_suffix(raw.trim())
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect();
    if cleaned.is_empty() {
        return cleaned;
    }
    format!("{:0>width$}", cleaned, width = HARMONIZED_CODE_LEN)
}

/// CPF/CNPJ: float suffix removed and `. - /` separators stripped.
pub fn owner_tax_id(raw: &str) -> String {
    strip_float_suffix(raw.trim())
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '/' | ' '))
        .collect()
}

/// Uppercase and map the known import/export spellings to their canonical
/// values. Anything else is returned uppercased for the validator to reject.
pub fn operation_mode(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if IMPORT_SYNONYMS.contains(&upper.as_str()) {
        "IMPORTACAO".to_string()
    } else if EXPORT_SYNONYMS.contains(&upper.as_str()) {
        "EXPORTACAO".to_string()
    } else {
        upper
    }
}

/// Map status spellings to `Ativado` / `Desativado`. Blank means active.
pub fn status(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Ativado".to_string();
    }
    let lower = trimmed.to_lowercase();
    if ACTIVE_TOKENS.contains(&lower.as_str()) {
        "Ativado".to_string()
    } else if INACTIVE_TOKENS.contains(&lower.as_str()) {
        "Desativado".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Apply the normalizer for a principal field.
pub fn principal(field: Field, raw: &str) -> String {
    match field {
        Field::HarmonizedCode => harmonized_code(raw),
        Field::OwnerTaxId => owner_tax_id(raw),
        Field::OperationMode => operation_mode(raw),
        Field::Status => status(raw),
        _ => raw.trim().to_string(),
    }
}

/// Split a multi-value cell on runs of `;`, `,`, `|` or newlines.
pub fn split_multi(raw: &str) -> Vec<String> {
    MULTI_SEPARATORS
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip `.0` only from values that read as numbers (`"82.0"` but not `"v1.0"`).
pub fn numeric_token(value: &str) -> String {
    let value = value.trim();
    if value.parse::<f64>().is_ok() {
        strip_float_suffix(value).to_string()
    } else {
        value.to_string()
    }
}

/// Normalize a simple attribute cell. Returns `None` for blank cells.
pub fn attribute_value(cell: &Cell) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    if let Cell::Bool(b) = cell {
        return Some(b.to_string());
    }

    let text = cell.to_text();
    let upper = text.to_uppercase();
    if TRUE_TOKENS.contains(&upper.as_str()) {
        Some("true".to_string())
    } else if FALSE_TOKENS.contains(&upper.as_str()) {
        Some("false".to_string())
    } else {
        Some(numeric_token(&text))
    }
}

/// Normalize a multi-value attribute cell into its tokens.
pub fn attribute_values(cell: &Cell) -> Vec<String> {
    split_multi(&cell.to_text())
        .iter()
        .map(|token| numeric_token(token))
        .collect()
}
