//! Error types for the rowbind pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`TransformationError`] - row-level error kinds attached to line results
//! - [`ConvertError`] - single-cell conversion failures
//! - [`ReadError`] - CSV/Excel reading errors
//! - [`ProfileError`] - bind-profile loading/compilation errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Row-level faults are
//! always captured as values in line results; nothing in the binding
//! pipeline unwinds past `bind`.

use thiserror::Error;

use crate::convert::SemanticType;

// =============================================================================
// Row-level error kinds
// =============================================================================

/// Kinds of problems a data row (or a whole batch) can exhibit.
///
/// Several kinds are never produced by the row pipeline itself:
/// `Creation` (instance construction is infallible here), `MissingColumn`,
/// `InvalidSeparator` and `DuplicatedValue` belong to upstream format and
/// uniqueness checks. They stay part of the public enum so diagnostics
/// from those layers share one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationError {
    /// The model instance could not be constructed.
    Creation,
    /// The dataset has fewer columns than the mapper expects.
    MissingColumn,
    /// The dataset has no headers at all (batch-level).
    NoData,
    /// A reference resolver found no match for a non-empty value.
    ReferenceNotFound,
    /// A non-nullable field received an empty value.
    RequiredFieldEmpty,
    /// Type conversion or a validation rule failed.
    ConversionFailed,
    /// The file's value separator differs from the configured one.
    InvalidSeparator,
    /// More than one occurrence of a value that should be unique.
    DuplicatedValue,
}

impl std::fmt::Display for TransformationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Creation => "instance creation failed",
            Self::MissingColumn => "missing column",
            Self::NoData => "no data",
            Self::ReferenceNotFound => "reference not found",
            Self::RequiredFieldEmpty => "required field empty",
            Self::ConversionFailed => "conversion failed",
            Self::InvalidSeparator => "invalid separator",
            Self::DuplicatedValue => "duplicated value",
        };
        f.write_str(text)
    }
}

// =============================================================================
// Cell conversion errors
// =============================================================================

/// Errors turning one raw cell value into a typed value.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Empty input for a non-nullable target type.
    #[error("required value is empty")]
    RequiredFieldEmpty,

    /// The value could not be converted to the target type.
    #[error("cannot convert '{value}' to {target}: {reason}")]
    ConversionFailed {
        value: String,
        target: SemanticType,
        reason: String,
    },
}

impl ConvertError {
    pub fn failed(value: impl Into<String>, target: SemanticType, reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            value: value.into(),
            target,
            reason: reason.into(),
        }
    }

    /// The row-level kind this conversion error maps to.
    pub fn kind(&self) -> TransformationError {
        match self {
            Self::RequiredFieldEmpty => TransformationError::RequiredFieldEmpty,
            Self::ConversionFailed { .. } => TransformationError::ConversionFailed,
        }
    }
}

// =============================================================================
// File reading errors
// =============================================================================

/// Errors reading a tabular file into a dataset.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Failed to read the file.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// File extension is not a supported tabular format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Content could not be decoded with the detected/requested encoding.
    #[error("failed to decode content as {0}")]
    Encoding(String),

    /// Delimited-text parsing failed.
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The delimiter is not a single-byte character.
    #[error("delimiter '{0}' is not an ASCII character")]
    InvalidDelimiter(char),

    /// Spreadsheet parsing failed.
    #[error("invalid workbook: {0}")]
    Excel(String),

    /// The file has no header row.
    #[error("no headers found in {0}")]
    NoHeaders(String),
}

// =============================================================================
// Bind profile errors
// =============================================================================

/// Errors loading or compiling a declarative bind profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile JSON is malformed.
    #[error("invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field entry has an empty header name.
    #[error("profile field #{0} has an empty header")]
    EmptyHeader(usize),

    /// An enumeration field declares no members.
    #[error("enumeration field '{0}' declares no members")]
    NoMembers(String),

    /// Failed to read the profile file.
    #[error("failed to read profile: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result type aliases
// =============================================================================

/// Result type for cell conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for file reading.
pub type IoResult<T> = Result<T, ReadError>;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_error_kind() {
        assert_eq!(
            ConvertError::RequiredFieldEmpty.kind(),
            TransformationError::RequiredFieldEmpty
        );
        let err = ConvertError::failed("abc", SemanticType::Integer, "not a number");
        assert_eq!(err.kind(), TransformationError::ConversionFailed);
    }

    #[test]
    fn test_convert_error_format() {
        let err = ConvertError::failed("10,x0", SemanticType::Decimal, "unparseable");
        let msg = err.to_string();
        assert!(msg.contains("10,x0"));
        assert!(msg.contains("decimal"));
        assert!(msg.contains("unparseable"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            TransformationError::RequiredFieldEmpty.to_string(),
            "required field empty"
        );
        assert_eq!(TransformationError::NoData.to_string(), "no data");
    }
}
