//! Spreadsheet to record mapping: header resolution, cell normalization and
//! row validation.

pub mod headers;
pub mod normalize;
pub mod rows;

pub use headers::{classify_header, resolve_headers, ColumnKind, ColumnMap, ResolvedColumn};
pub use rows::{normalize_row, read_products, ReadOutcome, RowContext, RowOptions};
