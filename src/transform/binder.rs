//! The top-level bind entry point.
//!
//! A [`ModelBinder`] ties a shared header mapper, a validation contract and
//! a conversion config together. `bind` transforms a dataset, applies the
//! mapper's static values to every valid row's entity, and partitions the
//! outcome into valid models plus one diagnostic entry per data row.

use std::sync::Arc;

use tracing::debug;

use crate::convert::ConvertConfig;
use crate::dataset::TabularDataset;
use crate::error::TransformationError;
use crate::mapper::HeaderMap;
use crate::transform::row::{RowResult, RowTransformer};
use crate::validate::Validate;

/// The outcome of one `bind` call.
///
/// `line_results` has exactly one entry per input data row, in input
/// order; `valid_models` is the order-preserving subsequence of entities
/// from valid rows. Batch-level conditions (headerless input) surface in
/// `batch_errors` with no line results at all.
#[derive(Debug)]
pub struct BindResult<T> {
    pub valid_models: Vec<T>,
    pub line_results: Vec<RowResult<T>>,
    pub batch_errors: Vec<TransformationError>,
}

impl<T> BindResult<T> {
    pub fn invalid_count(&self) -> usize {
        self.line_results.len() - self.valid_models.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} valid, {} invalid",
            self.line_results.len(),
            self.valid_models.len(),
            self.invalid_count()
        )
    }
}

/// Binds tabular datasets to instances of one model type.
///
/// The mapper is shared (`Arc`) because one registry is typically reused
/// across many binds, possibly concurrently; the binder itself is cheap.
pub struct ModelBinder<T, V> {
    mapper: Arc<HeaderMap<T>>,
    validator: V,
    config: ConvertConfig,
}

impl<T, V> ModelBinder<T, V>
where
    T: Clone + 'static,
    V: Validate<T>,
{
    pub fn new(mapper: Arc<HeaderMap<T>>, validator: V, config: ConvertConfig) -> Self {
        Self {
            mapper,
            validator,
            config,
        }
    }

    pub fn mapper(&self) -> &HeaderMap<T> {
        &self.mapper
    }

    /// Bind one dataset. Never fails: all faults are captured in the result.
    pub fn bind(&self, data: &TabularDataset) -> BindResult<T> {
        let transformer = RowTransformer::new(&self.mapper, &self.validator, &self.config);
        let outcome = transformer.transform(data);

        let mut valid_models = Vec::new();
        let mut line_results = outcome.rows;

        for row in &mut line_results {
            if !row.is_valid() {
                continue;
            }
            if let Some(entity) = row.entity.as_mut() {
                // Static values land after mapping and validation, so
                // postconditions like "every entity carries a generated
                // identifier" hold even when no row cell fed the field.
                self.mapper.apply_static_values(entity);
                valid_models.push(entity.clone());
            }
        }

        debug!(
            mapper = self.mapper.name(),
            dataset = %data.name,
            rows = line_results.len(),
            valid = valid_models.len(),
            "bind finished"
        );

        BindResult {
            valid_models,
            line_results,
            batch_errors: outcome.batch_errors,
        }
    }
}
