//! The external validation contract.
//!
//! Model validation is supplied by the caller: anything implementing
//! [`Validate`] (including plain closures) can be plugged into a binder.
//! An empty failure list means the instance is valid. Validation runs only
//! on rows whose field mapping produced no errors; its failures join the
//! row diagnostics without discarding already-applied field values.

use serde::Serialize;

/// One failed validation rule: the offending field plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Capability to validate one model instance.
pub trait Validate<T>: Send + Sync {
    /// Returns the failures; empty means valid.
    fn validate(&self, model: &T) -> Vec<ValidationFailure>;
}

/// Closures are validators.
impl<T, F> Validate<T> for F
where
    F: Fn(&T) -> Vec<ValidationFailure> + Send + Sync,
{
    fn validate(&self, model: &T) -> Vec<ValidationFailure> {
        self(model)
    }
}

/// The identity validator: every instance passes.
pub struct NoValidation;

impl<T> Validate<T> for NoValidation {
    fn validate(&self, _model: &T) -> Vec<ValidationFailure> {
        Vec::new()
    }
}
