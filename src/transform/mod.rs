//! Transformation module.
//!
//! Turns datasets into typed models:
//! - Row: the row-by-row transformer and its result types
//! - Binder: the top-level `bind` orchestration

pub mod binder;
pub mod row;

pub use binder::{BindResult, ModelBinder};
pub use row::{FieldError, RowResult, RowTransformer, TransformOutcome};
