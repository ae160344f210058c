//! Row normalization and validation.
//!
//! [`normalize_row`] turns one sheet row into a [`ProductRecord`] or records
//! why it cannot. [`read_products`] drives it over a whole sheet after the
//! header pass.

use crate::catalog::{
    AliasTable, Field, FieldDefaults, MAX_ATTRIBUTE_VALUE, MAX_DESCRIPTION, MAX_INTERNAL_CODE,
    MAX_NAME, MAX_OWNER_TAX_ID, HARMONIZED_CODE_LEN, REQUIRED_FOR_CREATE,
};
use crate::diagnostics::{Diagnostics, RowIssue};
use crate::models::{
    MultiValueAttribute, OperationMode, ProductCode, ProductRecord, SimpleAttribute, Status,
};
use crate::parser::{Sheet, SheetRow};

use super::headers::{resolve_headers, ColumnKind, ColumnMap};
use super::normalize;

/// Per-call row options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOptions {
    /// Cut over-long name/description to their limit with a warning instead
    /// of rejecting the row.
    pub truncate_long_text: bool,
}

/// Everything a row needs besides its own cells.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub columns: &'a ColumnMap,
    pub defaults: &'a FieldDefaults,
    pub options: RowOptions,
}

/// Records read from a sheet with the diagnostics of the whole pass.
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    pub records: Vec<ProductRecord>,
    pub diagnostics: Diagnostics,
    /// Non-blank data rows seen, valid or not.
    pub rows_read: usize,
}

/// Principal values of a row after per-field normalization.
#[derive(Debug, Default)]
struct PrincipalValues {
    code: String,
    name: String,
    description: String,
    owner_tax_id: String,
    status: String,
    operation_mode: String,
    harmonized_code: String,
    internal_codes: String,
}

impl PrincipalValues {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Code => &mut self.code,
            Field::Name => &mut self.name,
            Field::Description => &mut self.description,
            Field::OwnerTaxId => &mut self.owner_tax_id,
            Field::Status => &mut self.status,
            Field::OperationMode => &mut self.operation_mode,
            Field::HarmonizedCode => &mut self.harmonized_code,
            Field::InternalCodes => &mut self.internal_codes,
        }
    }

    fn get(&self, field: Field) -> &str {
        match field {
            Field::Code => &self.code,
            Field::Name => &self.name,
            Field::Description => &self.description,
            Field::OwnerTaxId => &self.owner_tax_id,
            Field::Status => &self.status,
            Field::OperationMode => &self.operation_mode,
            Field::HarmonizedCode => &self.harmonized_code,
            Field::InternalCodes => &self.internal_codes,
        }
    }
}

/// Normalize and validate one row.
///
/// Returns `None` for blank rows (silently) and for rows with at least one
/// validation error (recorded in `diagnostics`).
pub fn normalize_row(
    row: &SheetRow,
    ctx: &RowContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<ProductRecord> {
    if row.is_blank() {
        return None;
    }
    let line = row.number;

    let mut values = PrincipalValues {
        status: normalize::status(""),
        ..Default::default()
    };
    for (field, index) in ctx.columns.principal_columns() {
        *values.slot(field) = normalize::principal(field, &row.cell(index).to_text());
    }
    for &field in ctx.columns.defaulted_fields() {
        if let Some(default) = ctx.defaults.get(field) {
            *values.slot(field) = normalize::principal(field, default);
        }
    }

    if values.name.is_empty() && !values.description.is_empty() {
        values.name = values.description.chars().take(MAX_NAME).collect();
        diagnostics.warn(
            RowIssue::new(
                line,
                format!(
                    "'denominacao' is empty, using the first {} characters of 'descricao'",
                    MAX_NAME
                ),
            )
            .with_field(Field::Name.wire_name()),
        );
    }

    let errors_before = diagnostics.errors.len();
    validate_principal(line, &mut values, ctx.options, diagnostics);
    if diagnostics.errors.len() > errors_before {
        return None;
    }

    let status = Status::from_canonical(&values.status)?;
    let operation_mode = OperationMode::from_canonical(&values.operation_mode)?;

    let internal_codes = normalize::split_multi(&values.internal_codes);
    for code in &internal_codes {
        if code.chars().count() > MAX_INTERNAL_CODE {
            let shown: String = code.chars().take(30).collect();
            diagnostics.warn(
                RowIssue::new(
                    line,
                    format!(
                        "internal code '{}...' exceeds {} characters",
                        shown, MAX_INTERNAL_CODE
                    ),
                )
                .with_field(Field::InternalCodes.wire_name()),
            );
        }
    }

    let mut simple_attributes = Vec::new();
    let mut multi_value_attributes = Vec::new();
    for column in ctx.columns.attribute_columns() {
        let cell = row.cell(column.index);
        match &column.kind {
            ColumnKind::SimpleAttribute(code) => {
                let Some(value) = normalize::attribute_value(cell) else {
                    continue;
                };
                let len = value.chars().count();
                if len > MAX_ATTRIBUTE_VALUE {
                    diagnostics.warn(
                        RowIssue::new(
                            line,
                            format!("value exceeds {} characters (has {})", MAX_ATTRIBUTE_VALUE, len),
                        )
                        .with_field(code.as_str()),
                    );
                }
                simple_attributes.push(SimpleAttribute {
                    code: code.clone(),
                    value,
                });
            }
            ColumnKind::MultiAttribute(code) => {
                let values = normalize::attribute_values(cell);
                if !values.is_empty() {
                    multi_value_attributes.push(MultiValueAttribute {
                        code: code.clone(),
                        values,
                    });
                }
            }
            ColumnKind::Principal(_) => {}
        }
    }

    Some(ProductRecord {
        code: ProductCode::coerce(&values.code),
        name: values.name,
        description: values.description,
        owner_tax_id: values.owner_tax_id,
        status,
        operation_mode,
        harmonized_code: values.harmonized_code,
        internal_codes,
        simple_attributes,
        multi_value_attributes,
        composite_attributes: Vec::new(),
        composite_multi_attributes: Vec::new(),
        version: None,
    })
}

fn validate_principal(
    line: usize,
    values: &mut PrincipalValues,
    options: RowOptions,
    diagnostics: &mut Diagnostics,
) {
    for field in REQUIRED_FOR_CREATE {
        if values.get(field).is_empty() {
            diagnostics.error(
                RowIssue::new(line, "required field is empty").with_field(field.wire_name()),
            );
        }
    }

    let ncm = values.harmonized_code.as_str();
    if !ncm.is_empty() {
        if !ncm.chars().all(|c| c.is_ascii_digit()) {
            diagnostics.error(
                RowIssue::new(line, "NCM contains non-numeric characters")
                    .with_field(Field::HarmonizedCode.wire_name())
                    .with_value(ncm),
            );
        } else if ncm.len() != HARMONIZED_CODE_LEN {
            diagnostics.error(
                RowIssue::new(
                    line,
                    format!(
                        "NCM must have exactly {} digits (has {})",
                        HARMONIZED_CODE_LEN,
                        ncm.len()
                    ),
                )
                .with_field(Field::HarmonizedCode.wire_name())
                .with_value(ncm),
            );
        }
    }

    let mode = values.operation_mode.as_str();
    if !mode.is_empty() && OperationMode::from_canonical(mode).is_none() {
        diagnostics.error(
            RowIssue::new(line, "invalid operation mode, expected IMPORTACAO or EXPORTACAO")
                .with_field(Field::OperationMode.wire_name())
                .with_value(mode),
        );
    }

    if Status::from_canonical(&values.status).is_none() {
        diagnostics.error(
            RowIssue::new(line, "invalid status, expected Ativado or Desativado")
                .with_field(Field::Status.wire_name())
                .with_value(values.status.as_str()),
        );
    }

    let tax_id = values.owner_tax_id.as_str();
    if !tax_id.is_empty() {
        if !tax_id.chars().all(|c| c.is_ascii_digit()) {
            diagnostics.error(
                RowIssue::new(line, "must contain digits only")
                    .with_field(Field::OwnerTaxId.wire_name())
                    .with_value(tax_id),
            );
        } else if tax_id.len() > MAX_OWNER_TAX_ID {
            diagnostics.error(
                RowIssue::new(line, format!("exceeds {} characters", MAX_OWNER_TAX_ID))
                    .with_field(Field::OwnerTaxId.wire_name())
                    .with_value(tax_id),
            );
        }
    }

    check_length(line, Field::Name, &mut values.name, MAX_NAME, options, diagnostics);
    check_length(
        line,
        Field::Description,
        &mut values.description,
        MAX_DESCRIPTION,
        options,
        diagnostics,
    );
}

fn check_length(
    line: usize,
    field: Field,
    value: &mut String,
    max: usize,
    options: RowOptions,
    diagnostics: &mut Diagnostics,
) {
    let len = value.chars().count();
    if len <= max {
        return;
    }
    if options.truncate_long_text {
        *value = value.chars().take(max).collect();
        diagnostics.warn(
            RowIssue::new(line, format!("truncated from {} to {} characters", len, max))
                .with_field(field.wire_name()),
        );
    } else {
        diagnostics.error(
            RowIssue::new(line, format!("exceeds {} characters (has {})", max, len))
                .with_field(field.wire_name()),
        );
    }
}

/// Resolve headers and normalize every data row of a sheet.
///
/// A header failure leaves `records` empty and the errors in `diagnostics`.
pub fn read_products(
    sheet: &Sheet,
    aliases: &AliasTable,
    defaults: &FieldDefaults,
    options: RowOptions,
) -> ReadOutcome {
    let mut outcome = ReadOutcome::default();

    let columns = match resolve_headers(&sheet.headers, aliases, defaults, &mut outcome.diagnostics)
    {
        Ok(columns) => columns,
        Err(_) => return outcome,
    };

    let ctx = RowContext {
        columns: &columns,
        defaults,
        options,
    };

    for row in &sheet.rows {
        if row.is_blank() {
            continue;
        }
        outcome.rows_read += 1;
        if let Some(record) = normalize_row(row, &ctx, &mut outcome.diagnostics) {
            outcome.records.push(record);
        }
    }

    outcome
}
