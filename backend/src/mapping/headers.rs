//! Header resolution: classify every column of a sheet once.
//!
//! The result is an immutable [`ColumnMap`] keyed by column index. Principal
//! columns are matched against wire names first and the alias table second;
//! `ATT_<digits>` headers become attribute columns, multi-valued when the
//! header carries a `_MULTI` or `[MULTI]` marker.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::catalog::{AliasTable, Field, FieldDefaults, REQUIRED_FOR_CREATE};
use crate::diagnostics::{Diagnostics, RowIssue};
use crate::error::HeaderError;
use crate::logs::log_debug;
use crate::models::AttributeCode;

static ATTRIBUTE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ATT_\d+)(.*)$").expect("attribute header pattern is valid"));

/// What a column holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Principal(Field),
    SimpleAttribute(AttributeCode),
    MultiAttribute(AttributeCode),
}

/// A classified column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
    pub kind: ColumnKind,
}

/// Classified columns of one sheet, plus the defaults that fill missing ones.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub columns: Vec<ResolvedColumn>,
    fields: BTreeMap<Field, usize>,
    defaulted: Vec<Field>,
}

impl ColumnMap {
    /// Column index of a principal field, if the sheet has one.
    pub fn column_of(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Principal fields that will be filled from defaults.
    pub fn defaulted_fields(&self) -> &[Field] {
        &self.defaulted
    }

    /// Principal columns in sheet order.
    pub fn principal_columns(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.columns.iter().filter_map(|c| match c.kind {
            ColumnKind::Principal(field) if self.fields.get(&field) == Some(&c.index) => {
                Some((field, c.index))
            }
            _ => None,
        })
    }

    /// Attribute columns in sheet order.
    pub fn attribute_columns(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns
            .iter()
            .filter(|c| !matches!(c.kind, ColumnKind::Principal(_)))
    }
}

/// Classify a single header, without duplicate handling.
pub fn classify_header(header: &str, aliases: &AliasTable) -> Option<ColumnKind> {
    let normalized = header.trim().to_uppercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(caps) = ATTRIBUTE_HEADER.captures(&normalized) {
        let code = AttributeCode::parse(&caps[1])?;
        let rest = &caps[2];
        if rest.contains("_MULTI") || rest.contains("[MULTI]") {
            return Some(ColumnKind::MultiAttribute(code));
        }
        return Some(ColumnKind::SimpleAttribute(code));
    }

    Field::from_wire_name(header)
        .or_else(|| aliases.lookup(header))
        .map(ColumnKind::Principal)
}

/// Resolve a header row into a [`ColumnMap`].
///
/// Missing required fields are taken from `defaults` when possible. Every
/// field that has neither a column nor a default is recorded as an error and
/// resolution fails with [`HeaderError::MissingColumns`].
pub fn resolve_headers(
    headers: &[String],
    aliases: &AliasTable,
    defaults: &FieldDefaults,
    diagnostics: &mut Diagnostics,
) -> Result<ColumnMap, HeaderError> {
    let mut map = ColumnMap::default();

    for (index, header) in headers.iter().enumerate() {
        let Some(kind) = classify_header(header, aliases) else {
            if !header.trim().is_empty() {
                log_debug(&format!("Ignoring unmapped column '{}'", header.trim()));
            }
            continue;
        };

        if let ColumnKind::Principal(field) = kind {
            // A later column for the same field replaces the earlier one.
            if let Some(previous) = map.fields.insert(field, index) {
                map.columns.retain(|c| c.index != previous);
                diagnostics.warn(
                    RowIssue::general(format!(
                        "Column {} ('{}') also maps to '{}' and replaces column {} ('{}')",
                        index + 1,
                        header.trim(),
                        field,
                        previous + 1,
                        headers[previous].trim()
                    ))
                    .with_field(field.wire_name()),
                );
            }
        }

        map.columns.push(ResolvedColumn {
            index,
            header: header.trim().to_string(),
            kind,
        });
    }

    let mut missing = Vec::new();
    for field in REQUIRED_FOR_CREATE {
        if map.has_field(field) {
            continue;
        }
        if defaults.get(field).is_some() {
            map.defaulted.push(field);
            continue;
        }
        let mut message = format!("Required column '{}' not found", field);
        if let Some(hint) = field.missing_hint() {
            message.push_str(&format!(" ({})", hint));
        }
        diagnostics.error(RowIssue::general(message).with_field(field.wire_name()));
        missing.push(field);
    }

    // Optional fields with a default and no column (e.g. situacao) are applied too.
    for (field, _) in defaults.iter() {
        if !map.has_field(field) && !map.defaulted.contains(&field) {
            map.defaulted.push(field);
        }
    }

    if !missing.is_empty() {
        return Err(HeaderError::MissingColumns(missing));
    }

    if !map.defaulted.is_empty() {
        let listed = map
            .defaulted
            .iter()
            .map(|f| format!("{}='{}'", f, defaults.get(*f).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", ");
        diagnostics.warn(RowIssue::general(format!(
            "Fields filled from defaults: {}",
            listed
        )));
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn full_headers() -> Vec<String> {
        headers(&["denominacao", "descricao", "cpfCnpjRaiz", "modalidade", "ncm"])
    }

    #[test]
    fn test_canonical_headers() {
        let mut diag = Diagnostics::new();
        let map = resolve_headers(
            &full_headers(),
            &AliasTable::standard(),
            &FieldDefaults::new(),
            &mut diag,
        )
        .unwrap();
        assert_eq!(map.column_of(Field::HarmonizedCode), Some(4));
        assert_eq!(map.column_of(Field::Name), Some(0));
        assert!(diag.is_empty());
    }

    #[test]
    fn test_alias_headers() {
        let mut diag = Diagnostics::new();
        let hs = headers(&["Título", "Descrição do Produto", "CNPJ", "Tipo", "Classificação Fiscal", "EAN"]);
        let map = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag)
            .unwrap();
        assert_eq!(map.column_of(Field::Name), Some(0));
        assert_eq!(map.column_of(Field::Description), Some(1));
        assert_eq!(map.column_of(Field::OwnerTaxId), Some(2));
        assert_eq!(map.column_of(Field::OperationMode), Some(3));
        assert_eq!(map.column_of(Field::HarmonizedCode), Some(4));
        assert_eq!(map.column_of(Field::InternalCodes), Some(5));
    }

    #[test]
    fn test_simple_and_multi_attribute_columns_are_independent() {
        let mut hs = full_headers();
        hs.extend(headers(&["ATT_100", "ATT_100_MULTI", "att_200 [MULTI]", "ATT_300 - Cor"]));
        let mut diag = Diagnostics::new();
        let map = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag)
            .unwrap();

        let kinds: Vec<_> = map.attribute_columns().map(|c| c.kind.clone()).collect();
        let code = |s: &str| AttributeCode::parse(s).unwrap();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::SimpleAttribute(code("ATT_100")),
                ColumnKind::MultiAttribute(code("ATT_100")),
                ColumnKind::MultiAttribute(code("ATT_200")),
                ColumnKind::SimpleAttribute(code("ATT_300")),
            ]
        );
    }

    #[test]
    fn test_unknown_headers_ignored() {
        let mut hs = full_headers();
        hs.push("Preço".to_string());
        hs.push(String::new());
        let mut diag = Diagnostics::new();
        let map = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag)
            .unwrap();
        assert_eq!(map.columns.len(), 5);
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_missing_columns_without_defaults() {
        let mut diag = Diagnostics::new();
        let hs = headers(&["denominacao", "ncm"]);
        let err = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag)
            .unwrap_err();
        let HeaderError::MissingColumns(fields) = err;
        assert_eq!(
            fields,
            vec![Field::Description, Field::OwnerTaxId, Field::OperationMode]
        );
        assert_eq!(diag.errors.len(), 3);
        assert!(diag.errors.iter().all(|e| e.row.is_none()));
    }

    #[test]
    fn test_defaults_fill_missing_columns_with_one_warning() {
        let mut diag = Diagnostics::new();
        let hs = headers(&["denominacao", "descricao", "ncm"]);
        let defaults = FieldDefaults::new()
            .with(Field::OwnerTaxId, "25940099")
            .with(Field::OperationMode, "IMPORTACAO");
        let map = resolve_headers(&hs, &AliasTable::standard(), &defaults, &mut diag).unwrap();
        assert_eq!(
            map.defaulted_fields(),
            &[Field::OwnerTaxId, Field::OperationMode]
        );
        assert_eq!(diag.warnings.len(), 1);
        assert!(diag.warnings[0].message.contains("cpfCnpjRaiz='25940099'"));
    }

    #[test]
    fn test_duplicate_principal_column_last_wins() {
        let mut hs = full_headers();
        hs.push("NCM/SH".to_string());
        let mut diag = Diagnostics::new();
        let map = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag)
            .unwrap();
        assert_eq!(map.column_of(Field::HarmonizedCode), Some(hs.len() - 1));
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(map.principal_columns().count(), 5);
    }

    #[test]
    fn test_product_name_column_after_product_code() {
        let hs = headers(&["PRODUTO", "NOME DO PRODUTO", "descricao", "ncm"]);
        let mut diag = Diagnostics::new();
        let map = resolve_headers(&hs, &AliasTable::standard(), &FieldDefaults::new(), &mut diag);
        assert!(map.is_err());

        let defaults = FieldDefaults::new()
            .with(Field::OwnerTaxId, "25940099")
            .with(Field::OperationMode, "IMPORTACAO");
        let mut diag = Diagnostics::new();
        let map = resolve_headers(&hs, &AliasTable::standard(), &defaults, &mut diag).unwrap();
        assert_eq!(map.column_of(Field::Name), Some(1));
        assert!(diag.warnings[0].message.contains("NOME DO PRODUTO"));
    }
}
