//! # rowbind - schema-aware tabular data binding
//!
//! rowbind maps rows from tabular sources (CSV, Excel, database extracts)
//! onto typed Rust models through a declarative header mapper, converting
//! cell text under configurable locale rules and reporting per-row
//! diagnostics instead of aborting the batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CSV/Excel  │────▶│TabularDataset│────▶│ ModelBinder  │────▶│ BindResult  │
//! │   (io::*)   │     │ (headers +   │     │ (mapper +    │     │ (models +   │
//! │             │     │  string rows)│     │  validation) │     │  line diags)│
//! └─────────────┘     └──────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rowbind::{ConvertConfig, FieldAccessor, HeaderMap, ModelBinder, NoValidation, TabularDataset};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Material {
//!     code: String,
//!     ncm: Option<i64>,
//! }
//!
//! let mapper = Arc::new(
//!     HeaderMap::new("material")
//!         .map("Codigo do Material", FieldAccessor::text("code", |m: &mut Material, v| m.code = v))
//!         .map("NCM", FieldAccessor::optional_integer("ncm", |m: &mut Material, v| m.ncm = Some(v))),
//! );
//! let binder = ModelBinder::new(mapper, NoValidation, ConvertConfig::new());
//!
//! let data = TabularDataset::with_rows(
//!     "materials",
//!     vec!["Codigo do Material".into(), "NCM".into()],
//!     vec![vec![Some("MAT-1".into()), Some("8471".into())]],
//! );
//! let result = binder.bind(&data);
//! assert_eq!(result.valid_models.len(), 1);
//! assert_eq!(result.valid_models[0].ncm, Some(8471));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - error taxonomy and `thiserror` hierarchies
//! - [`dataset`] - the `TabularDataset` exchange type
//! - [`convert`] - locale-aware cell value conversion
//! - [`mapper`] - header→field registries and accessors
//! - [`transform`] - the row transformer and model binder
//! - [`validate`] - the pluggable validation contract
//! - [`profile`] - declarative JSON bind profiles
//! - [`io`] - CSV/Excel readers and the CSV writer

pub mod convert;
pub mod dataset;
pub mod error;
pub mod io;
pub mod mapper;
pub mod profile;
pub mod transform;
pub mod validate;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConvertError, ProfileError, ReadError, TransformationError};

// =============================================================================
// Re-exports - Core pipeline
// =============================================================================

pub use convert::{
    convert, format_decimal, parse_boolean, parse_date, parse_datetime, parse_decimal,
    parse_float, parse_integer, ConvertConfig, SemanticType, TypedValue,
};
pub use dataset::TabularDataset;
pub use mapper::{FieldAccessor, HeaderMap};
pub use transform::{BindResult, FieldError, ModelBinder, RowResult, RowTransformer, TransformOutcome};
pub use validate::{NoValidation, Validate, ValidationFailure};

// =============================================================================
// Re-exports - Profiles and I/O
// =============================================================================

pub use io::{
    read_csv_bytes, read_csv_file, read_excel_file, read_tabular_file, write_csv_file,
    CsvReadOptions, CsvSource, ExcelReadOptions,
};
pub use profile::{example_profile, BindProfile, FieldSpec, Record};
