//! Flatten CATP JSON records back into spreadsheet rows.
//!
//! ```text
//! [{ codigo, denominacao, ..., atributos:[{atributo,valor}],
//!    atributosMultivalorados:[{atributo,valores}] }]
//!                         ↓
//! codigo | denominacao | ... | codigosInterno | ATT_1 | ATT_9 | ATT_5_MULTI
//! ```
//!
//! Attribute columns are discovered across all records first, so every row
//! has the same layout. Missing fields and lists are tolerated.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::catalog::PRINCIPAL_COLUMNS;
use crate::error::{ProjectionError, ProjectionResult};
use crate::parser::{Cell, Sheet, SheetRow};

/// Suffix marking multi-valued attribute columns.
pub const MULTI_SUFFIX: &str = "_MULTI";

/// Separator used when joining list values into one cell.
pub const LIST_SEPARATOR: &str = ";";

/// Attribute codes found across a set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeColumns {
    pub simple: BTreeSet<String>,
    pub multi: BTreeSet<String>,
}

impl AttributeColumns {
    /// Header row: principal columns, simple codes, then `<code>_MULTI`.
    pub fn headers(&self) -> Vec<String> {
        PRINCIPAL_COLUMNS
            .iter()
            .map(|f| f.wire_name().to_string())
            .chain(self.simple.iter().cloned())
            .chain(self.multi.iter().map(|code| format!("{code}{MULTI_SUFFIX}")))
            .collect()
    }
}

fn entries<'a>(record: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    record
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn entry_code(entry: &Value) -> Option<&str> {
    entry
        .get("atributo")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

/// Union of simple and multi attribute codes over all records.
pub fn discover_attribute_codes(records: &[Value]) -> AttributeColumns {
    let mut columns = AttributeColumns::default();

    for record in records {
        for entry in entries(record, "atributos") {
            if let Some(code) = entry_code(entry) {
                columns.simple.insert(code.to_string());
            }
        }
        for entry in entries(record, "atributosMultivalorados") {
            if let Some(code) = entry_code(entry) {
                columns.multi.insert(code.to_string());
            }
        }
    }

    columns
}

/// Stringify a scalar JSON value. `null` and containers become blank.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn joined(values: &Value) -> String {
    match values {
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        other => scalar_text(other),
    }
}

/// Flatten one record into cells matching `columns.headers()`.
pub fn flatten_record(record: &Value, columns: &AttributeColumns) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(PRINCIPAL_COLUMNS.len() + columns.simple.len() + columns.multi.len());

    for field in PRINCIPAL_COLUMNS {
        let text = match record.get(field.wire_name()) {
            Some(value @ Value::Array(_)) => joined(value),
            Some(value) => scalar_text(value),
            None => String::new(),
        };
        cells.push(Cell::text(text));
    }

    for code in &columns.simple {
        let value = entries(record, "atributos")
            .find(|entry| entry_code(entry) == Some(code.as_str()))
            .and_then(|entry| entry.get("valor"))
            .map(scalar_text)
            .unwrap_or_default();
        cells.push(Cell::text(value));
    }

    for code in &columns.multi {
        let value = entries(record, "atributosMultivalorados")
            .find(|entry| entry_code(entry) == Some(code.as_str()))
            .and_then(|entry| entry.get("valores"))
            .map(joined)
            .unwrap_or_default();
        cells.push(Cell::text(value));
    }

    cells
}

/// Turn a product object or an array of products into a sheet.
///
/// Data rows are numbered from 2, the header being row 1.
pub fn reverse_project(json: &Value) -> ProjectionResult<Sheet> {
    let records: Vec<Value> = match json {
        Value::Array(items) => {
            if let Some(idx) = items.iter().position(|item| !item.is_object()) {
                return Err(ProjectionError::NotARecord(idx));
            }
            items.clone()
        }
        Value::Object(_) => vec![json.clone()],
        _ => return Err(ProjectionError::NotARecordList),
    };

    let columns = discover_attribute_codes(&records);
    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| SheetRow {
            number: idx + 2,
            cells: flatten_record(record, &columns),
        })
        .collect();

    Ok(Sheet {
        headers: columns.headers(),
        rows,
    })
}
