//! JSON Schema validation for projected CATP payloads.
//!
//! One Draft 7 schema per payload shape, embedded at compile time from the
//! `schemas/` directory:
//! - `product-create.json`
//! - `product-update.json`
//! - `product-full-export.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use catpload::{validate_payload, OutputMode};
//!
//! let item = json!({
//!     "descricao": "Arco", "denominacao": "Arco", "cpfCnpjRaiz": "25940099",
//!     "situacao": "Ativado", "modalidade": "IMPORTACAO", "ncm": "90211010"
//! });
//! assert!(validate_payload(OutputMode::Create, &item).is_ok());
//! ```

use serde_json::Value;

use crate::projection::OutputMode;

const CREATE_SCHEMA: &str = include_str!("../../schemas/product-create.json");
const UPDATE_SCHEMA: &str = include_str!("../../schemas/product-update.json");
const FULL_EXPORT_SCHEMA: &str = include_str!("../../schemas/product-full-export.json");

/// Validate a JSON value against a schema.
///
/// Returns every violation message, or the schema error itself when the
/// schema does not compile.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parsed schema for a payload shape.
pub fn schema_for(mode: OutputMode) -> Result<Value, String> {
    let raw = match mode {
        OutputMode::Create => CREATE_SCHEMA,
        OutputMode::Update => UPDATE_SCHEMA,
        OutputMode::FullExport => FULL_EXPORT_SCHEMA,
    };
    serde_json::from_str(raw).map_err(|e| format!("Invalid embedded {} schema: {}", mode, e))
}

/// Compiled validator for one payload shape, reused across items.
pub struct PayloadValidator {
    validator: jsonschema::Validator,
}

impl PayloadValidator {
    pub fn new(mode: OutputMode) -> Result<Self, String> {
        let schema = schema_for(mode)?;
        let validator = jsonschema::draft7::new(&schema)
            .map_err(|e| format!("Invalid embedded {} schema: {}", mode, e))?;
        Ok(Self { validator })
    }

    pub fn validate(&self, data: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(data)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validate one payload against the schema of its shape.
pub fn validate_payload(mode: OutputMode, data: &Value) -> Result<(), Vec<String>> {
    let schema = schema_for(mode).map_err(|e| vec![e])?;
    validate(&schema, data)
}

/// Guess the shape of a payload from its keys.
pub fn detect_mode(data: &Value) -> OutputMode {
    if data.get("seq").is_some() || data.get("versao").is_some() {
        OutputMode::FullExport
    } else if data.get("codigo").is_some() {
        OutputMode::Update
    } else {
        OutputMode::Create
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_item() -> Value {
        json!({
            "descricao": "Arco ortodontico",
            "denominacao": "Arco",
            "cpfCnpjRaiz": "25940099",
            "situacao": "Ativado",
            "modalidade": "IMPORTACAO",
            "ncm": "90211010",
            "atributos": [{"atributo": "ATT_14545", "valor": "82"}],
            "atributosMultivalorados": [{"atributo": "ATT_14556", "valores": ["1", "2"]}],
            "atributosCompostos": [],
            "atributosCompostosMultivalorados": [],
            "codigosInterno": ["A1"]
        })
    }

    #[test]
    fn test_embedded_schemas_compile() {
        for mode in [OutputMode::Create, OutputMode::Update, OutputMode::FullExport] {
            assert!(PayloadValidator::new(mode).is_ok(), "{mode} schema");
        }
    }

    #[test]
    fn test_valid_create() {
        assert!(validate_payload(OutputMode::Create, &create_item()).is_ok());
    }

    #[test]
    fn test_create_rejects_server_fields() {
        let mut item = create_item();
        item["codigo"] = json!(10);
        assert!(validate_payload(OutputMode::Create, &item).is_err());
    }

    #[test]
    fn test_bad_ncm_and_mode() {
        let mut item = create_item();
        item["ncm"] = json!("9021101");
        item["modalidade"] = json!("IMP");
        let errors = validate_payload(OutputMode::Create, &item).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_update_and_full_export() {
        let mut update = create_item();
        update["codigo"] = json!("X9");
        assert!(validate_payload(OutputMode::Update, &update).is_ok());

        let mut full = create_item();
        full["seq"] = json!(1);
        full["codigo"] = json!(10);
        full["versao"] = json!("1");
        let validator = PayloadValidator::new(OutputMode::FullExport).unwrap();
        assert!(validator.validate(&full).is_ok());

        full.as_object_mut().unwrap().remove("versao");
        assert!(validator.validate(&full).is_err());
    }

    #[test]
    fn test_detect_mode() {
        let mut item = create_item();
        assert_eq!(detect_mode(&item), OutputMode::Create);
        item["codigo"] = json!(1);
        assert_eq!(detect_mode(&item), OutputMode::Update);
        item["seq"] = json!(1);
        assert_eq!(detect_mode(&item), OutputMode::FullExport);
    }
}
