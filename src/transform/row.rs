//! Row-by-row transformation of a dataset into model instances.
//!
//! The transformer walks every data row, applies reference resolution,
//! field mapping and the special-mappings hook per column, then runs the
//! validation contract. Every fault is captured in the row's result; no
//! row's failure affects any other row, and nothing escapes the batch.

use tracing::debug;

use crate::convert::{convert, ConvertConfig};
use crate::dataset::TabularDataset;
use crate::error::{ConvertError, TransformationError};
use crate::mapper::HeaderMap;
use crate::validate::{Validate, ValidationFailure};

/// A recorded per-column fault: which column, which kind, and a message
/// pinning down line, value and target type for operator review.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub header: String,
    pub kind: TransformationError,
    pub message: String,
}

impl FieldError {
    fn from_convert(header: &str, line: usize, err: &ConvertError) -> Self {
        Self {
            header: header.to_string(),
            kind: err.kind(),
            message: format!("line {}, column '{}': {}", line, header, err),
        }
    }

    fn reference_not_found(header: &str, line: usize, raw: &str) -> Self {
        Self {
            header: header.to_string(),
            kind: TransformationError::ReferenceNotFound,
            message: format!(
                "line {}, column '{}': no entity matches '{}'",
                line, header, raw
            ),
        }
    }
}

/// The outcome of one data row.
///
/// `entity` is populated only when the row produced zero errors of any
/// kind; partially mapped instances are never exposed.
#[derive(Debug, Clone)]
pub struct RowResult<T> {
    /// 1-based file line; the header occupies line 1, so data starts at 2.
    pub line_number: usize,
    pub entity: Option<T>,
    pub field_errors: Vec<FieldError>,
    pub validation_failures: Vec<ValidationFailure>,
}

impl<T> RowResult<T> {
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.validation_failures.is_empty()
    }

    /// Whether any recorded field error has the given kind.
    pub fn has_error(&self, kind: TransformationError) -> bool {
        self.field_errors.iter().any(|e| e.kind == kind)
    }
}

/// The outcome of transforming a whole dataset.
#[derive(Debug)]
pub struct TransformOutcome<T> {
    /// Batch-level signals (`NoData` for a headerless dataset).
    pub batch_errors: Vec<TransformationError>,
    /// One entry per data row, in input order.
    pub rows: Vec<RowResult<T>>,
}

/// Runs one dataset through a header mapper, producing a [`RowResult`]
/// per data row.
pub struct RowTransformer<'a, T> {
    mapper: &'a HeaderMap<T>,
    validator: &'a dyn Validate<T>,
    config: &'a ConvertConfig,
}

impl<'a, T: 'static> RowTransformer<'a, T> {
    pub fn new(
        mapper: &'a HeaderMap<T>,
        validator: &'a dyn Validate<T>,
        config: &'a ConvertConfig,
    ) -> Self {
        Self {
            mapper,
            validator,
            config,
        }
    }

    pub fn transform(&self, data: &TabularDataset) -> TransformOutcome<T> {
        if !data.has_headers() {
            debug!(dataset = %data.name, "dataset has no headers, nothing to transform");
            return TransformOutcome {
                batch_errors: vec![TransformationError::NoData],
                rows: Vec::new(),
            };
        }

        let rows = data
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| self.transform_row(row, &data.headers, index + 2))
            .collect();

        TransformOutcome {
            batch_errors: Vec::new(),
            rows,
        }
    }

    fn transform_row(
        &self,
        row: &[Option<String>],
        headers: &[String],
        line_number: usize,
    ) -> RowResult<T> {
        let mut model = self.mapper.create_instance();
        let mut field_errors = Vec::new();

        // Ragged rows are tolerated: only the overlapping columns count.
        for (header, cell) in headers.iter().zip(row.iter()) {
            let raw = cell.as_deref().unwrap_or("");
            self.process_column(&mut model, header, raw, line_number, &mut field_errors);
            self.mapper.apply_special(&mut model, header, raw);
        }

        let validation_failures = if field_errors.is_empty() {
            self.validator.validate(&model)
        } else {
            Vec::new()
        };

        if !field_errors.is_empty() || !validation_failures.is_empty() {
            debug!(
                line = line_number,
                field_errors = field_errors.len(),
                validation_failures = validation_failures.len(),
                "row rejected"
            );
        }

        let entity = if field_errors.is_empty() && validation_failures.is_empty() {
            Some(model)
        } else {
            None
        };

        RowResult {
            line_number,
            entity,
            field_errors,
            validation_failures,
        }
    }

    /// Reference resolution takes precedence over plain mapping; when a
    /// resolver matches, the conversion path for that header must not run.
    fn process_column(
        &self,
        model: &mut T,
        header: &str,
        raw: &str,
        line_number: usize,
        field_errors: &mut Vec<FieldError>,
    ) {
        match self.mapper.resolve_reference(model, header, raw) {
            Some(true) => {}
            Some(false) => {
                // An empty cell simply has no reference to resolve.
                if !raw.trim().is_empty() {
                    field_errors.push(FieldError::reference_not_found(header, line_number, raw));
                }
            }
            None => {
                let Some(accessor) = self.mapper.mapping(header) else {
                    return;
                };
                let converted = convert(
                    raw,
                    accessor.semantic_type(),
                    accessor.is_nullable(),
                    self.config,
                );
                match converted {
                    Ok(Some(value)) => {
                        let compiled = self.mapper.compiled(accessor);
                        if let Err(err) = (compiled.apply)(model, value) {
                            field_errors.push(FieldError::from_convert(header, line_number, &err));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        field_errors.push(FieldError::from_convert(header, line_number, &err));
                    }
                }
            }
        }
    }
}
