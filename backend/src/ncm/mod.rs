//! Per-NCM attribute filtering.
//!
//! The Siscomex attribute table lists, for each NCM, which attribute codes are
//! valid and whether they are mandatory or multi-valued. Filtering is an
//! optional pass over already validated records: it never rejects a product,
//! it only drops or reclassifies attributes and reports what it did.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::diagnostics::RowIssue;
use crate::error::FilterResult;
use crate::logs::log_info;
use crate::models::{AttributeCode, ProductRecord, SimpleAttribute};

/// Rules for one attribute within one NCM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRule {
    pub mandatory: bool,
    pub multi_valued: bool,
    /// Operation mode the attribute applies to, as published (may be blank).
    pub mode: String,
}

// Wire format of the official table.
#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(rename = "listaNcm", default)]
    ncms: Vec<NcmEntry>,
}

#[derive(Debug, Deserialize)]
struct NcmEntry {
    #[serde(rename = "codigoNcm")]
    code: String,
    #[serde(rename = "listaAtributos", default)]
    attributes: Vec<AttributeEntry>,
}

#[derive(Debug, Deserialize)]
struct AttributeEntry {
    #[serde(rename = "codigo")]
    code: String,
    #[serde(rename = "obrigatorio", default)]
    mandatory: bool,
    #[serde(rename = "multivalorado", default)]
    multi_valued: bool,
    #[serde(rename = "modalidade", default)]
    mode: String,
}

/// Valid attributes per NCM, keyed by the NCM without dots.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    ncms: BTreeMap<String, BTreeMap<String, AttributeRule>>,
}

impl AttributeTable {
    pub fn from_json_str(content: &str) -> FilterResult<Self> {
        let file: TableFile = serde_json::from_str(content)?;
        let ncms = file
            .ncms
            .into_iter()
            .map(|entry| {
                let rules = entry
                    .attributes
                    .into_iter()
                    .map(|a| {
                        (
                            a.code,
                            AttributeRule {
                                mandatory: a.mandatory,
                                multi_valued: a.multi_valued,
                                mode: a.mode,
                            },
                        )
                    })
                    .collect();
                (entry.code.replace('.', ""), rules)
            })
            .collect();
        Ok(Self { ncms })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> FilterResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&content)?;
        log_info(&format!(
            "Loaded attribute rules for {} NCMs from {}",
            table.len(),
            path.as_ref().display()
        ));
        Ok(table)
    }

    /// Rules for an NCM, if the table knows it.
    pub fn rules(&self, ncm: &str) -> Option<&BTreeMap<String, AttributeRule>> {
        self.ncms.get(ncm.trim())
    }

    pub fn len(&self) -> usize {
        self.ncms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ncms.is_empty()
    }
}

/// Keep only the attributes valid for each record's NCM.
///
/// Records whose NCM is not in the table pass through untouched. Multi
/// attributes that the table declares single-valued become simple attributes
/// holding their first value.
pub fn filter_attributes(
    mut records: Vec<ProductRecord>,
    table: &AttributeTable,
) -> (Vec<ProductRecord>, Vec<RowIssue>) {
    let mut warnings = Vec::new();

    for record in &mut records {
        let Some(rules) = table.rules(&record.harmonized_code) else {
            continue;
        };
        let ncm = record.harmonized_code.clone();
        let label = record.label();

        let mut removed = Vec::new();
        record.simple_attributes.retain(|a| {
            let keep = rules.contains_key(a.code.as_str());
            if !keep {
                removed.push(a.code.to_string());
            }
            keep
        });
        if !removed.is_empty() {
            warnings.push(RowIssue::general(format!(
                "Product '{}': removed attributes not valid for NCM {}: {}",
                label,
                ncm,
                removed.join(", ")
            )));
        }

        let mut removed_multi = Vec::new();
        let mut kept_multi = Vec::new();
        for attribute in std::mem::take(&mut record.multi_value_attributes) {
            match rules.get(attribute.code.as_str()) {
                Some(rule) if rule.multi_valued => kept_multi.push(attribute),
                Some(_) => {
                    if let Some(first) = attribute.values.into_iter().next() {
                        warnings.push(RowIssue::general(format!(
                            "Product '{}': {} converted from multi-valued to simple",
                            label, attribute.code
                        )));
                        record.simple_attributes.push(SimpleAttribute {
                            code: attribute.code,
                            value: first,
                        });
                    }
                }
                None => removed_multi.push(attribute.code.to_string()),
            }
        }
        record.multi_value_attributes = kept_multi;
        if !removed_multi.is_empty() {
            warnings.push(RowIssue::general(format!(
                "Product '{}': removed multi-valued attributes not valid for NCM {}: {}",
                label,
                ncm,
                removed_multi.join(", ")
            )));
        }

        let present: HashSet<&str> = record
            .simple_attributes
            .iter()
            .map(|a| a.code.as_str())
            .chain(record.multi_value_attributes.iter().map(|a| a.code.as_str()))
            .collect();
        for (code, rule) in rules {
            if rule.mandatory && !present.contains(code.as_str()) {
                warnings.push(RowIssue::general(format!(
                    "Product '{}': missing mandatory attribute {} for NCM {}",
                    label, code, ncm
                )));
            }
        }
    }

    (records, warnings)
}

/// Insert `code = value` at the front of every record that lacks `code`.
///
/// Returns how many records were changed.
pub fn inject_default_attribute(
    records: &mut [ProductRecord],
    code: &AttributeCode,
    value: &str,
) -> usize {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }

    let mut injected = 0;
    for record in records.iter_mut().filter(|r| !r.has_attribute(code)) {
        record.simple_attributes.insert(
            0,
            SimpleAttribute {
                code: code.clone(),
                value: value.to_string(),
            },
        );
        injected += 1;
    }
    injected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MultiValueAttribute, OperationMode, Status};

    const TABLE: &str = r#"{
        "versao": "2026-02-22",
        "listaNcm": [
            {
                "codigoNcm": "9021.10.10",
                "listaAtributos": [
                    {"codigo": "ATT_14545", "obrigatorio": true, "multivalorado": false, "modalidade": "Importação"},
                    {"codigo": "ATT_14547", "obrigatorio": true, "multivalorado": false},
                    {"codigo": "ATT_14556", "obrigatorio": false, "multivalorado": true},
                    {"codigo": "ATT_15120", "obrigatorio": false, "multivalorado": false}
                ]
            }
        ]
    }"#;

    fn code(s: &str) -> AttributeCode {
        AttributeCode::parse(s).unwrap()
    }

    fn record(ncm: &str) -> ProductRecord {
        ProductRecord {
            code: None,
            name: "Arco".into(),
            description: "Arco".into(),
            owner_tax_id: "25940099".into(),
            status: Status::Active,
            operation_mode: OperationMode::Import,
            harmonized_code: ncm.into(),
            internal_codes: vec![],
            simple_attributes: vec![
                SimpleAttribute { code: code("ATT_14545"), value: "82".into() },
                SimpleAttribute { code: code("ATT_99999"), value: "x".into() },
            ],
            multi_value_attributes: vec![
                MultiValueAttribute { code: code("ATT_14556"), values: vec!["1".into(), "2".into()] },
                MultiValueAttribute { code: code("ATT_15120"), values: vec!["aco".into(), "ferro".into()] },
                MultiValueAttribute { code: code("ATT_88888"), values: vec!["z".into()] },
            ],
            composite_attributes: vec![],
            composite_multi_attributes: vec![],
            version: None,
        }
    }

    #[test]
    fn test_table_keys_without_dots() {
        let table = AttributeTable::from_json_str(TABLE).unwrap();
        assert_eq!(table.len(), 1);
        let rules = table.rules("90211010").unwrap();
        assert!(rules["ATT_14545"].mandatory);
        assert_eq!(rules["ATT_14545"].mode, "Importação");
        assert!(rules["ATT_14556"].multi_valued);
    }

    #[test]
    fn test_filter_removes_reclassifies_and_warns() {
        let table = AttributeTable::from_json_str(TABLE).unwrap();
        let (records, warnings) = filter_attributes(vec![record("90211010")], &table);
        let r = &records[0];

        let simple: Vec<_> = r.simple_attributes.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(simple, vec!["ATT_14545", "ATT_15120"]);
        assert_eq!(r.simple_attributes[1].value, "aco");
        assert_eq!(r.multi_value_attributes.len(), 1);
        assert_eq!(r.multi_value_attributes[0].code.as_str(), "ATT_14556");

        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("ATT_99999"));
        assert!(messages[1].contains("ATT_15120 converted"));
        assert!(messages[2].contains("ATT_88888"));
        assert!(messages[3].contains("mandatory attribute ATT_14547"));
    }

    #[test]
    fn test_unknown_ncm_untouched() {
        let table = AttributeTable::from_json_str(TABLE).unwrap();
        let original = record("30049099");
        let (records, warnings) = filter_attributes(vec![original.clone()], &table);
        assert_eq!(records[0], original);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_inject_default_attribute() {
        let mut with = record("90211010");
        let mut without = record("90211010");
        without.simple_attributes.retain(|a| a.code.as_str() != "ATT_14545");
        with.simple_attributes[0].value = "105".into();

        let mut records = vec![with, without];
        let injected = inject_default_attribute(&mut records, &code("ATT_14545"), "82");
        assert_eq!(injected, 1);
        assert_eq!(records[0].simple_attributes[0].value, "105");
        assert_eq!(records[1].simple_attributes[0].code.as_str(), "ATT_14545");
        assert_eq!(records[1].simple_attributes[0].value, "82");
    }

    #[test]
    fn test_invalid_table_json() {
        assert!(AttributeTable::from_json_str("{not json").is_err());
    }
}
