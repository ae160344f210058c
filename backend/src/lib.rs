//! # Catpload - Siscomex CATP product catalog conversion
//!
//! Catpload maps product catalog spreadsheets (XLSX or CSV, as kept by
//! importers and exporters) to the JSON payloads of the Siscomex CATP
//! product API, and flattens exported JSON back into an editable sheet.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│   Mapping   │────▶│ Projection  │──▶ CATP JSON
//! │ (any enc.)  │     │ (auto-fmt)  │     │ (headers +  │     │ (POST/PUT/  │   (schema
//! └─────────────┘     └─────────────┘     │  rows)      │     │  COMPLETO)  │    checked)
//!                                         └─────────────┘     └─────────────┘
//!        ▲                                                           │
//!        └──────────────────── reverse projection ◀──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catpload::{convert_file, ConvertOptions, OutputMode};
//!
//! let options = ConvertOptions { mode: OutputMode::Update, ..Default::default() };
//! let summary = convert_file("catalogo.xlsx", &options)?;
//! println!("{} products", summary.record_count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Product record and typed codes
//! - [`catalog`] - Field catalogue, limits, aliases and defaults
//! - [`diagnostics`] - Row-level errors and warnings
//! - [`parser`] - XLSX / CSV reading and writing
//! - [`mapping`] - Header resolution and row normalization
//! - [`projection`] - Records to payloads, and JSON back to rows
//! - [`ncm`] - Per-NCM attribute filtering
//! - [`validation`] - Output JSON schemas
//! - [`pipeline`] - End-to-end conversions
//! - [`logs`] - Progress log

// Core modules
pub mod error;
pub mod models;
pub mod catalog;
pub mod diagnostics;

// Reading and writing sheets
pub mod parser;

// Sheet → records
pub mod mapping;

// Records ↔ JSON
pub mod projection;
pub mod ncm;

// Validation
pub mod validation;

// Orchestration
pub mod pipeline;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConversionError, FilterError, HeaderError, ProjectionError, SheetError};

// =============================================================================
// Re-exports - Models and catalogue
// =============================================================================

pub use models::{
    AttributeCode,
    MultiValueAttribute,
    OperationMode,
    ProductCode,
    ProductRecord,
    SimpleAttribute,
    Status,
};

pub use catalog::{
    attribute_label,
    AliasTable,
    Field,
    FieldDefaults,
    ATTRIBUTE_LABELS,
    PRINCIPAL_COLUMNS,
};

pub use diagnostics::{Diagnostics, RowIssue};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    read_sheet_bytes,
    read_sheet_file,
    write_sheet_file,
    Cell,
    ParseResult,
    Sheet,
    SheetRow,
    SourceFormat,
};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{read_products, resolve_headers, ColumnMap, ReadOutcome, RowOptions};

// =============================================================================
// Re-exports - Projection
// =============================================================================

pub use projection::{
    project,
    project_create,
    project_full_export,
    project_update,
    reverse_project,
    OutputMode,
    Projection,
};

pub use ncm::{filter_attributes, AttributeRule, AttributeTable};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{detect_mode, validate_payload, PayloadValidator};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    check_bytes,
    check_file,
    convert_bytes,
    convert_file,
    json_to_sheet,
    validate_json_file,
    CheckReport,
    ConvertOptions,
    ConvertSummary,
    ConvertedCatalog,
    PayloadIssues,
};
