//! Projection of product records into CATP JSON payloads.
//!
//! Three output shapes share the same business body:
//!
//! ```text
//! create       { descricao, denominacao, ..., codigosInterno }
//! update       { codigo, <create body> }
//! full-export  { seq, codigo, descricao, ..., ncm, versao, atributos, ... }
//! ```
//!
//! Projection is pure: records are borrowed, never validated or modified,
//! and output order follows input order.

pub mod reverse;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::RowIssue;
use crate::models::{
    MultiValueAttribute, OperationMode, ProductCode, ProductRecord, SimpleAttribute, Status,
};

pub use reverse::{discover_attribute_codes, flatten_record, reverse_project, AttributeColumns};

// =============================================================================
// Output Mode
// =============================================================================

/// Which payload shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// New products (POST): no server identifiers.
    #[default]
    Create,
    /// Existing products (PUT): leading `codigo`.
    Update,
    /// Mirror of a catalog export: `seq`, `codigo` and `versao`.
    FullExport,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Create => "create",
            OutputMode::Update => "update",
            OutputMode::FullExport => "full-export",
        }
    }

    /// Tag used in generated file names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            OutputMode::Create => "POST",
            OutputMode::Update => "PUT",
            OutputMode::FullExport => "COMPLETO",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" | "post" => Ok(OutputMode::Create),
            "update" | "put" => Ok(OutputMode::Update),
            "full-export" | "full" | "completo" => Ok(OutputMode::FullExport),
            other => Err(format!(
                "unknown mode '{}', expected create, update or full-export",
                other
            )),
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Fields shared by every payload shape, in API key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadBody<'a> {
    #[serde(flatten)]
    pub fields: ProductFields<'a>,
    #[serde(flatten)]
    pub lists: AttributeLists<'a>,
}

/// Scalar business fields, `descricao` through `ncm`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFields<'a> {
    #[serde(rename = "descricao")]
    pub description: &'a str,
    #[serde(rename = "denominacao")]
    pub name: &'a str,
    #[serde(rename = "cpfCnpjRaiz")]
    pub owner_tax_id: &'a str,
    #[serde(rename = "situacao")]
    pub status: Status,
    #[serde(rename = "modalidade")]
    pub operation_mode: OperationMode,
    pub ncm: &'a str,
}

/// Attribute lists and internal codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeLists<'a> {
    #[serde(rename = "atributos")]
    pub simple_attributes: &'a [SimpleAttribute],
    #[serde(rename = "atributosMultivalorados")]
    pub multi_value_attributes: &'a [MultiValueAttribute],
    #[serde(rename = "atributosCompostos")]
    pub composite_attributes: &'a [Value],
    #[serde(rename = "atributosCompostosMultivalorados")]
    pub composite_multi_attributes: &'a [Value],
    #[serde(rename = "codigosInterno")]
    pub internal_codes: &'a [String],
}

impl<'a> PayloadBody<'a> {
    pub fn of(record: &'a ProductRecord) -> Self {
        Self {
            fields: ProductFields {
                description: &record.description,
                name: &record.name,
                owner_tax_id: &record.owner_tax_id,
                status: record.status,
                operation_mode: record.operation_mode,
                ncm: &record.harmonized_code,
            },
            lists: AttributeLists {
                simple_attributes: &record.simple_attributes,
                multi_value_attributes: &record.multi_value_attributes,
                composite_attributes: &record.composite_attributes,
                composite_multi_attributes: &record.composite_multi_attributes,
                internal_codes: &record.internal_codes,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePayload<'a> {
    #[serde(rename = "codigo")]
    pub code: &'a ProductCode,
    #[serde(flatten)]
    pub body: PayloadBody<'a>,
}

/// Portal export order: `versao` sits between `ncm` and the attribute lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullExportPayload<'a> {
    pub seq: u64,
    #[serde(rename = "codigo")]
    pub code: i64,
    #[serde(flatten)]
    pub fields: ProductFields<'a>,
    #[serde(rename = "versao")]
    pub version: &'a str,
    #[serde(flatten)]
    pub lists: AttributeLists<'a>,
}

/// One projected product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductPayload<'a> {
    Create(PayloadBody<'a>),
    Update(UpdatePayload<'a>),
    FullExport(FullExportPayload<'a>),
}

impl ProductPayload<'_> {
    /// Shape actually produced; an update item without code is a create.
    pub fn shape(&self) -> OutputMode {
        match self {
            ProductPayload::Create(_) => OutputMode::Create,
            ProductPayload::Update(_) => OutputMode::Update,
            ProductPayload::FullExport(_) => OutputMode::FullExport,
        }
    }
}

/// Projected items plus the warnings raised while projecting.
#[derive(Debug, Clone, Default)]
pub struct Projection<'a> {
    pub items: Vec<ProductPayload<'a>>,
    pub warnings: Vec<RowIssue>,
}

impl Projection<'_> {
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.items)
    }
}

// =============================================================================
// Projectors
// =============================================================================

/// Project records in the requested mode.
pub fn project(records: &[ProductRecord], mode: OutputMode) -> Projection<'_> {
    match mode {
        OutputMode::Create => project_create(records),
        OutputMode::Update => project_update(records),
        OutputMode::FullExport => project_full_export(records),
    }
}

pub fn project_create(records: &[ProductRecord]) -> Projection<'_> {
    Projection {
        items: records
            .iter()
            .map(|r| ProductPayload::Create(PayloadBody::of(r)))
            .collect(),
        warnings: Vec::new(),
    }
}

/// Update payloads. A record without `codigo` cannot be updated and is
/// emitted as a create payload at the same position, with a warning.
pub fn project_update(records: &[ProductRecord]) -> Projection<'_> {
    let mut projection = Projection::default();

    for record in records {
        let body = PayloadBody::of(record);
        match &record.code {
            Some(code) => projection
                .items
                .push(ProductPayload::Update(UpdatePayload { code, body })),
            None => {
                projection.warnings.push(RowIssue::general(format!(
                    "Product '{}' has no codigo and was exported as a create payload",
                    record.label()
                )));
                projection.items.push(ProductPayload::Create(body));
            }
        }
    }

    projection
}

/// Full-export payloads numbered from 1.
///
/// `codigo` is the record's integer code when it has one, otherwise the
/// sequence number; `versao` defaults to `"1"`.
pub fn project_full_export(records: &[ProductRecord]) -> Projection<'_> {
    let items = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let seq = idx as u64 + 1;
            let body = PayloadBody::of(record);
            ProductPayload::FullExport(FullExportPayload {
                seq,
                code: record
                    .code
                    .as_ref()
                    .and_then(ProductCode::as_i64)
                    .unwrap_or(seq as i64),
                fields: body.fields,
                version: record.version.as_deref().unwrap_or("1"),
                lists: body.lists,
            })
        })
        .collect();

    Projection {
        items,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeCode;

    fn record(code: Option<ProductCode>) -> ProductRecord {
        ProductRecord {
            code,
            name: "Arco".into(),
            description: "Arco ortodontico".into(),
            owner_tax_id: "25940099".into(),
            status: Status::Active,
            operation_mode: OperationMode::Import,
            harmonized_code: "90211010".into(),
            internal_codes: vec!["A1".into()],
            simple_attributes: vec![SimpleAttribute {
                code: AttributeCode::parse("ATT_14545").unwrap(),
                value: "82".into(),
            }],
            multi_value_attributes: vec![],
            composite_attributes: vec![],
            composite_multi_attributes: vec![],
            version: None,
        }
    }

    #[test]
    fn test_create_has_no_server_fields() {
        let records = vec![record(Some(ProductCode::Number(7)))];
        let json = project_create(&records).to_json().unwrap();
        let item = &json[0];
        assert!(item.get("codigo").is_none());
        assert!(item.get("seq").is_none());
        assert!(item.get("versao").is_none());
        assert_eq!(item["ncm"], "90211010");
        assert_eq!(item["situacao"], "Ativado");
        assert_eq!(item["modalidade"], "IMPORTACAO");
        assert_eq!(item["atributos"][0]["atributo"], "ATT_14545");
        assert_eq!(item["atributosCompostos"], serde_json::json!([]));
    }

    #[test]
    fn test_create_key_order() {
        let records = vec![record(None)];
        let text = serde_json::to_string(&project_create(&records).items).unwrap();
        let desc = text.find("\"descricao\"").unwrap();
        let name = text.find("\"denominacao\"").unwrap();
        let codes = text.find("\"codigosInterno\"").unwrap();
        assert!(desc < name && name < codes);
    }

    #[test]
    fn test_update_leading_code() {
        let records = vec![record(Some(ProductCode::Number(7)))];
        let projection = project_update(&records);
        assert!(projection.warnings.is_empty());
        let text = serde_json::to_string(&projection.items).unwrap();
        assert!(text.starts_with("[{\"codigo\":7,\"descricao\""));
    }

    #[test]
    fn test_update_without_code_falls_back_to_create() {
        let records = vec![
            record(Some(ProductCode::Number(1))),
            record(None),
            record(Some(ProductCode::Text("X9".into()))),
        ];
        let projection = project_update(&records);
        let shapes: Vec<_> = projection.items.iter().map(|p| p.shape()).collect();
        assert_eq!(
            shapes,
            vec![OutputMode::Update, OutputMode::Create, OutputMode::Update]
        );
        assert_eq!(projection.warnings.len(), 1);
        let json = projection.to_json().unwrap();
        assert_eq!(json[2]["codigo"], "X9");
    }

    #[test]
    fn test_full_export_metadata() {
        let mut versioned = record(Some(ProductCode::Text("55".into())));
        versioned.version = Some("3".into());
        let records = vec![record(None), versioned, record(Some(ProductCode::Text("AB".into())))];
        let projection = project_full_export(&records);
        let text = serde_json::to_string(&projection.items[0]).unwrap();
        assert!(text.starts_with("{\"seq\":1,\"codigo\":1,\"descricao\""));
        assert!(text.contains("\"ncm\":\"90211010\",\"versao\":\"1\",\"atributos\""));

        let json = projection.to_json().unwrap();
        for (idx, item) in json.as_array().unwrap().iter().enumerate() {
            assert_eq!(item["seq"], idx as u64 + 1);
        }
        assert_eq!(json[0]["codigo"], 1);
        assert_eq!(json[0]["versao"], "1");
        assert_eq!(json[1]["codigo"], 55);
        assert_eq!(json[1]["versao"], "3");
        assert_eq!(json[2]["codigo"], 3);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("POST".parse::<OutputMode>(), Ok(OutputMode::Create));
        assert_eq!("put".parse::<OutputMode>(), Ok(OutputMode::Update));
        assert_eq!("completo".parse::<OutputMode>(), Ok(OutputMode::FullExport));
        assert!("delete".parse::<OutputMode>().is_err());
    }
}
