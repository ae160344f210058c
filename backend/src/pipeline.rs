//! High-level conversion API.
//!
//! Combines every step: reading the sheet, header resolution, row
//! normalization, optional attribute defaults and NCM filtering, projection,
//! schema validation and writing the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use catpload::pipeline::{convert_file, ConvertOptions};
//! use catpload::OutputMode;
//!
//! let options = ConvertOptions {
//!     mode: OutputMode::FullExport,
//!     ..ConvertOptions::default()
//! };
//! let summary = convert_file("catalogo.xlsx", &options)?;
//! println!("{} products written to {}", summary.record_count, summary.output_path.display());
//! ```
//!
//! A conversion never produces partial output: if any row has an error the
//! call fails with [`ConversionError::Rejected`] and nothing is written.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::catalog::{AliasTable, FieldDefaults, ORIGIN_COUNTRY_ATTRIBUTE};
use crate::diagnostics::{Diagnostics, RowIssue};
use crate::error::{ConversionError, ConversionResult};
use crate::logs::{log_error, log_error_indent, log_info, log_success, log_warning, log_warning_indent};
use crate::mapping::{read_products, RowOptions};
use crate::models::{AttributeCode, ProductRecord};
use crate::ncm::{filter_attributes, inject_default_attribute, AttributeTable};
use crate::parser::{read_sheet_bytes, write_sheet_file, ParseResult, Sheet, SourceFormat};
use crate::projection::{project, reverse_project, OutputMode};
use crate::validation::{detect_mode, PayloadValidator};

/// Options for a spreadsheet to JSON conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Output file; generated next to the input when absent
    pub output: Option<PathBuf>,

    /// Payload shape
    pub mode: OutputMode,

    /// Indented JSON
    pub pretty: bool,

    /// Values for principal fields that have no column
    pub defaults: FieldDefaults,

    /// Header aliases
    pub aliases: AliasTable,

    /// Cut over-long name/description instead of rejecting the row
    pub truncate_long_text: bool,

    /// Official per-NCM attribute table (JSON)
    pub attribute_table: Option<PathBuf>,

    /// Country of origin injected as ATT_14545 where missing
    pub default_origin_country: Option<String>,

    /// Skip the output schema check
    pub skip_validation: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output: None,
            mode: OutputMode::Create,
            pretty: true,
            defaults: FieldDefaults::new(),
            aliases: AliasTable::standard(),
            truncate_long_text: false,
            attribute_table: None,
            default_origin_country: None,
            skip_validation: false,
        }
    }
}

/// Result of an in-memory conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedCatalog {
    /// Serialized JSON array
    pub json: String,
    pub record_count: usize,
    pub mode: OutputMode,
    pub warnings: Vec<RowIssue>,
}

/// Result of a file conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertSummary {
    pub output_path: PathBuf,
    pub record_count: usize,
    pub size_bytes: u64,
    pub mode: OutputMode,
    pub warnings: Vec<RowIssue>,
}

/// Result of a validation-only pass over a spreadsheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub valid: bool,
    /// Valid products found (0 when any error was recorded)
    pub record_count: usize,
    pub rows_read: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
}

/// Schema violations of one item of a JSON file (1-based index)
#[derive(Debug, Clone, Serialize)]
pub struct PayloadIssues {
    pub index: usize,
    pub mode: OutputMode,
    pub errors: Vec<String>,
}

// =============================================================================
// Spreadsheet → JSON
// =============================================================================

/// Convert a spreadsheet file and write the JSON output.
pub fn convert_file<P: AsRef<Path>>(
    input: P,
    options: &ConvertOptions,
) -> ConversionResult<ConvertSummary> {
    let input = input.as_ref();
    log_info(format!("Reading {}", input.display()));
    let bytes = std::fs::read(input)?;
    let converted = convert_bytes(&bytes, options)?;

    let output_path = match &options.output {
        Some(path) => path.clone(),
        None => default_output_path(input, options.mode),
    };
    std::fs::write(&output_path, converted.json.as_bytes())?;
    let size_bytes = std::fs::metadata(&output_path)?.len();

    log_success(format!(
        "{} product(s) written to {} ({:.1} KB, mode {})",
        converted.record_count,
        output_path.display(),
        size_bytes as f64 / 1024.0,
        options.mode
    ));

    Ok(ConvertSummary {
        output_path,
        record_count: converted.record_count,
        size_bytes,
        mode: options.mode,
        warnings: converted.warnings,
    })
}

/// Convert spreadsheet bytes (XLSX or CSV) into a JSON document.
pub fn convert_bytes(bytes: &[u8], options: &ConvertOptions) -> ConversionResult<ConvertedCatalog> {
    let parsed = read_sheet_bytes(bytes)?;
    log_parse_info(&parsed);
    convert_sheet(&parsed.sheet, options)
}

/// Convert an already parsed sheet.
pub fn convert_sheet(sheet: &Sheet, options: &ConvertOptions) -> ConversionResult<ConvertedCatalog> {
    let (mut records, mut diagnostics) = read_valid_products(sheet, options)?;

    if let Some(country) = options.default_origin_country.as_deref() {
        if let Some(code) = AttributeCode::parse(ORIGIN_COUNTRY_ATTRIBUTE) {
            let injected = inject_default_attribute(&mut records, &code, country);
            if injected > 0 {
                log_info(format!("{} = '{}' added to {} product(s)", code, country.trim(), injected));
            }
        }
    }

    if let Some(path) = &options.attribute_table {
        let table = AttributeTable::load(path)?;
        let (filtered, warnings) = filter_attributes(records, &table);
        records = filtered;
        diagnostics.warnings.extend(warnings);
    }

    let projection = project(&records, options.mode);
    diagnostics.warnings.extend(projection.warnings.iter().cloned());

    if !options.skip_validation {
        log_info("Validating output against the CATP schema...");
        let items = projection.to_json()?;
        validate_items(&items)?;
        log_success("All products match the schema");
    }

    let json = if options.pretty {
        serde_json::to_string_pretty(&projection.items)?
    } else {
        serde_json::to_string(&projection.items)?
    };

    report_warnings(&diagnostics);

    Ok(ConvertedCatalog {
        json,
        record_count: records.len(),
        mode: options.mode,
        warnings: diagnostics.warnings,
    })
}

/// Read products, turning any recorded error into a rejection.
fn read_valid_products(
    sheet: &Sheet,
    options: &ConvertOptions,
) -> ConversionResult<(Vec<ProductRecord>, Diagnostics)> {
    let row_options = RowOptions {
        truncate_long_text: options.truncate_long_text,
    };
    let outcome = read_products(sheet, &options.aliases, &options.defaults, row_options);

    if outcome.diagnostics.has_errors() {
        log_error(format!(
            "{} error(s) found in the spreadsheet",
            outcome.diagnostics.errors.len()
        ));
        for issue in &outcome.diagnostics.errors {
            log_error_indent(issue.to_string(), 1);
        }
        return Err(ConversionError::Rejected(outcome.diagnostics));
    }
    if outcome.records.is_empty() {
        return Err(ConversionError::NoProducts);
    }

    log_success(format!("{} valid product(s)", outcome.records.len()));
    Ok((outcome.records, outcome.diagnostics))
}

fn validate_items(items: &Value) -> ConversionResult<()> {
    let mut create = None;
    let mut update = None;
    let mut full_export = None;

    for (idx, item) in items.as_array().into_iter().flatten().enumerate() {
        let mode = detect_mode(item);
        let slot = match mode {
            OutputMode::Create => &mut create,
            OutputMode::Update => &mut update,
            OutputMode::FullExport => &mut full_export,
        };
        if slot.is_none() {
            *slot = Some(PayloadValidator::new(mode).map_err(ConversionError::Schema)?);
        }
        if let Some(validator) = slot.as_ref() {
            if let Err(errors) = validator.validate(item) {
                return Err(ConversionError::InvalidPayload {
                    index: idx + 1,
                    errors,
                });
            }
        }
    }
    Ok(())
}

/// Validate a spreadsheet without producing output.
///
/// Row errors are part of the report, not an `Err`.
pub fn check_file<P: AsRef<Path>>(input: P, options: &ConvertOptions) -> ConversionResult<CheckReport> {
    let bytes = std::fs::read(input.as_ref())?;
    check_bytes(&bytes, options)
}

pub fn check_bytes(bytes: &[u8], options: &ConvertOptions) -> ConversionResult<CheckReport> {
    let parsed = read_sheet_bytes(bytes)?;
    log_parse_info(&parsed);

    let row_options = RowOptions {
        truncate_long_text: options.truncate_long_text,
    };
    let outcome = read_products(&parsed.sheet, &options.aliases, &options.defaults, row_options);
    let valid = !outcome.diagnostics.has_errors();

    if valid {
        log_success(format!("{} valid product(s)", outcome.records.len()));
    } else {
        log_error(format!("{} error(s) found", outcome.diagnostics.errors.len()));
    }
    report_warnings(&outcome.diagnostics);

    Ok(CheckReport {
        valid,
        record_count: if valid { outcome.records.len() } else { 0 },
        rows_read: outcome.rows_read,
        errors: outcome.diagnostics.errors,
        warnings: outcome.diagnostics.warnings,
    })
}

// =============================================================================
// JSON → Spreadsheet
// =============================================================================

/// Flatten a CATP JSON file (one product or an array) into a spreadsheet.
///
/// The output format follows the extension of `output` (`.xlsx` or CSV).
/// Returns the number of products written.
pub fn json_to_sheet<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> ConversionResult<usize> {
    let content = std::fs::read_to_string(input.as_ref())?;
    let json: Value = serde_json::from_str(&content)?;
    let sheet = reverse_project(&json)?;

    let attribute_columns = sheet.headers.len() - crate::catalog::PRINCIPAL_COLUMNS.len();
    write_sheet_file(&sheet, output.as_ref())?;

    log_success(format!(
        "{} product(s) written to {} ({} attribute column(s))",
        sheet.rows.len(),
        output.as_ref().display(),
        attribute_columns
    ));
    Ok(sheet.rows.len())
}

/// Check every item of a JSON file against the schema of its shape.
///
/// `mode` forces a shape; otherwise it is detected per item.
pub fn validate_json_file<P: AsRef<Path>>(
    input: P,
    mode: Option<OutputMode>,
) -> ConversionResult<Vec<PayloadIssues>> {
    let content = std::fs::read_to_string(input.as_ref())?;
    let json: Value = serde_json::from_str(&content)?;
    let items: Vec<Value> = match json {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut issues = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let item_mode = mode.unwrap_or_else(|| detect_mode(item));
        let validator = PayloadValidator::new(item_mode).map_err(ConversionError::Schema)?;
        if let Err(errors) = validator.validate(item) {
            issues.push(PayloadIssues {
                index: idx + 1,
                mode: item_mode,
                errors,
            });
        }
    }
    Ok(issues)
}

// =============================================================================
// Helpers
// =============================================================================

/// `<dir>/<stem>_<POST|PUT|COMPLETO>_<YYYYmmddHHMMSS>.json`
pub fn default_output_path(input: &Path, mode: OutputMode) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalogo");
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    input.with_file_name(format!("{}_{}_{}.json", stem, mode.file_tag(), timestamp))
}

fn log_parse_info(parsed: &ParseResult) {
    match parsed.format {
        SourceFormat::Xlsx => log_info("Detected format: XLSX (first worksheet)"),
        SourceFormat::Csv { delimiter } => log_info(format!(
            "Detected format: CSV (encoding {}, separator '{}')",
            parsed.encoding,
            format_delimiter(delimiter)
        )),
    }
    log_info(format!(
        "{} column(s), {} data row(s)",
        parsed.sheet.headers.len(),
        parsed.sheet.rows.len()
    ));
}

fn report_warnings(diagnostics: &Diagnostics) {
    if diagnostics.warnings.is_empty() {
        return;
    }
    log_warning(format!("{} warning(s)", diagnostics.warnings.len()));
    for issue in &diagnostics.warnings {
        log_warning_indent(issue.to_string(), 1);
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Field;

    const CSV: &str = "codigo;denominacao;descricao;cpfCnpjRaiz;situacao;modalidade;ncm;codigosInterno;ATT_14547\n\
                       10;Arco;Arco ortodontico;25940099;Ativado;IMP;9021.10.10;A1;Sim\n\
                       ;Gel;Gel dental;25940099;;EXP;30049099;;\n";

    fn options(mode: OutputMode) -> ConvertOptions {
        ConvertOptions {
            mode,
            pretty: false,
            ..ConvertOptions::default()
        }
    }

    #[test]
    fn test_convert_bytes_create() {
        let out = convert_bytes(CSV.as_bytes(), &options(OutputMode::Create)).unwrap();
        assert_eq!(out.record_count, 2);
        let json: Value = serde_json::from_str(&out.json).unwrap();
        assert!(json[0].get("codigo").is_none());
        assert_eq!(json[0]["ncm"], "90211010");
        assert_eq!(json[0]["atributos"][0]["valor"], "true");
    }

    #[test]
    fn test_update_fallback_warning_surfaces() {
        let out = convert_bytes(CSV.as_bytes(), &options(OutputMode::Update)).unwrap();
        let json: Value = serde_json::from_str(&out.json).unwrap();
        assert_eq!(json[0]["codigo"], 10);
        assert!(json[1].get("codigo").is_none());
        assert!(out.warnings.iter().any(|w| w.message.contains("create payload")));
    }

    #[test]
    fn test_rejected_when_any_row_fails() {
        let csv = format!("{CSV};Bad;Bad;25940099;;IMP;ABC;;\n");
        let err = convert_bytes(csv.as_bytes(), &options(OutputMode::Create)).unwrap_err();
        let diagnostics = err.diagnostics().unwrap();
        assert_eq!(diagnostics.errors.len(), 1);
        assert_eq!(diagnostics.errors[0].row, Some(4));
    }

    #[test]
    fn test_error_row_counts_blank_lines() {
        let csv = "denominacao;descricao;cpfCnpjRaiz;modalidade;ncm\n\
                   Arco;Arco;25940099;IMP;90211010\n\
                   \n\
                   Gel;Gel;25940099;EXP;ABC\n";
        let err = convert_bytes(csv.as_bytes(), &options(OutputMode::Create)).unwrap_err();
        let diagnostics = err.diagnostics().unwrap();
        assert_eq!(diagnostics.errors.len(), 1);
        assert_eq!(diagnostics.errors[0].row, Some(4));
        assert_eq!(diagnostics.errors[0].field.as_deref(), Some("ncm"));
    }

    #[test]
    fn test_no_products() {
        let csv = "denominacao;descricao;cpfCnpjRaiz;modalidade;ncm\n;;;;\n";
        let err = convert_bytes(csv.as_bytes(), &options(OutputMode::Create)).unwrap_err();
        assert!(matches!(err, ConversionError::NoProducts));
    }

    #[test]
    fn test_default_origin_country_injected() {
        let mut opts = options(OutputMode::Create);
        opts.default_origin_country = Some("82".to_string());
        let out = convert_bytes(CSV.as_bytes(), &opts).unwrap();
        let json: Value = serde_json::from_str(&out.json).unwrap();
        assert_eq!(json[0]["atributos"][0]["atributo"], "ATT_14545");
        assert_eq!(json[1]["atributos"][0]["valor"], "82");
    }

    #[test]
    fn test_defaults_cover_missing_columns() {
        let csv = "denominacao;descricao;ncm\nArco;Desc;90211010\n";
        let mut opts = options(OutputMode::FullExport);
        opts.defaults = FieldDefaults::new()
            .with(Field::OwnerTaxId, "25940099")
            .with(Field::OperationMode, "IMPORTACAO");
        let out = convert_bytes(csv.as_bytes(), &opts).unwrap();
        let json: Value = serde_json::from_str(&out.json).unwrap();
        assert_eq!(json[0]["seq"], 1);
        assert_eq!(json[0]["cpfCnpjRaiz"], "25940099");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_convert_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("catalogo.csv");
        std::fs::write(&input, CSV).unwrap();

        let summary = convert_file(&input, &options(OutputMode::FullExport)).unwrap();
        let name = summary.output_path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("catalogo_COMPLETO_"));
        assert!(name.ends_with(".json"));
        assert_eq!(summary.record_count, 2);
        assert!(summary.size_bytes > 0);
    }

    #[test]
    fn test_rejected_conversion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        let output = dir.path().join("out.json");
        std::fs::write(&input, "denominacao;descricao;cpfCnpjRaiz;modalidade;ncm\nA;B;1;XX;1\n").unwrap();

        let mut opts = options(OutputMode::Create);
        opts.output = Some(output.clone());
        assert!(convert_file(&input, &opts).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_check_reports_errors_without_failing() {
        let csv = "denominacao;descricao;cpfCnpjRaiz;modalidade;ncm\nA;B;1;XX;90211010\nC;D;2;IMP;90211010\n";
        let report = check_bytes(csv.as_bytes(), &options(OutputMode::Create)).unwrap();
        assert!(!report.valid);
        assert_eq!(report.record_count, 0);
        assert_eq!(report.rows_read, 2);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_validate_json_file_reports_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        let out = convert_bytes(CSV.as_bytes(), &options(OutputMode::Create)).unwrap();
        let mut json: Value = serde_json::from_str(&out.json).unwrap();
        json[1]["ncm"] = Value::String("123".into());
        std::fs::write(&path, json.to_string()).unwrap();

        let issues = validate_json_file(&path, None).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 2);
        assert_eq!(issues[0].mode, OutputMode::Create);
    }
}
