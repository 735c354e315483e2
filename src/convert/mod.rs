//! Cell value conversion.
//!
//! Turns one raw string cell into a typed value, given a semantic type tag
//! and a [`ConvertConfig`] carrying locale and format rules. Numeric parsing
//! is deliberately tolerant of mixed regional formats: the same batch often
//! contains `1.234,56` and `1,234.56`, and the policy below resolves both.
//!
//! # Separator policy
//!
//! After stripping everything but digits, `.`, `,` and `-`:
//!
//! 1. If the last `,` occurs after the last `.`, the comma is the decimal
//!    separator (regional format) and dots are grouping.
//! 2. Otherwise an invariant (dot-decimal) parse is attempted first, with a
//!    comma-decimal parse as fallback.
//!
//! So `"1.234,56"` and `"1,234.56"` both yield `1234.56`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

/// Everything that is not part of a number.
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.,\-]").expect("static pattern"));

// =============================================================================
// Semantic types and typed values
// =============================================================================

/// Semantic type tag of a destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Enumeration,
}

impl SemanticType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Enumeration => "enumeration",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A successfully converted cell value.
///
/// Serializes untagged, so a bound record renders as plain JSON values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl TypedValue {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Text(_) => SemanticType::Text,
            Self::Integer(_) => SemanticType::Integer,
            Self::Float(_) => SemanticType::Float,
            Self::Decimal(_) => SemanticType::Decimal,
            Self::Boolean(_) => SemanticType::Boolean,
            Self::Date(_) => SemanticType::Date,
            Self::DateTime(_) => SemanticType::DateTime,
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(v) => f.write_str(v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Conversion configuration
// =============================================================================

/// A caller-supplied converter overriding the built-in rule for one type.
pub type Converter = Arc<dyn Fn(&str) -> ConvertResult<TypedValue> + Send + Sync>;

/// Locale and format rules for cell conversion.
///
/// Built once per binding run and shared read-only. Overrides registered
/// with [`with_converter`] take precedence over the built-in rules for
/// that exact semantic type.
///
/// [`with_converter`]: ConvertConfig::with_converter
#[derive(Clone)]
pub struct ConvertConfig {
    date_format: String,
    datetime_format: String,
    true_token: String,
    decimal_separator: char,
    converters: HashMap<SemanticType, Converter>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            datetime_format: "%d/%m/%Y %H:%M:%S".to_string(),
            true_token: "SIM".to_string(),
            decimal_separator: '.',
            converters: HashMap::new(),
        }
    }
}

impl ConvertConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact format used for `Date` cells (chrono syntax).
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Exact format used for `DateTime` cells.
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// The single token read as `true` (case-insensitive). Default `"SIM"`.
    pub fn with_true_token(mut self, token: impl Into<String>) -> Self {
        self.true_token = token.into();
        self
    }

    /// Decimal separator used when formatting decimals back to text.
    pub fn with_decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = separator;
        self
    }

    /// Register an override converter for one semantic type.
    pub fn with_converter(
        mut self,
        ty: SemanticType,
        converter: impl Fn(&str) -> ConvertResult<TypedValue> + Send + Sync + 'static,
    ) -> Self {
        self.converters.insert(ty, Arc::new(converter));
        self
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn datetime_format(&self) -> &str {
        &self.datetime_format
    }

    pub fn true_token(&self) -> &str {
        &self.true_token
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// The override converter for a type, if one was registered.
    pub fn converter(&self, ty: SemanticType) -> Option<&Converter> {
        self.converters.get(&ty)
    }
}

impl std::fmt::Debug for ConvertConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertConfig")
            .field("date_format", &self.date_format)
            .field("datetime_format", &self.datetime_format)
            .field("true_token", &self.true_token)
            .field("decimal_separator", &self.decimal_separator)
            .field("overrides", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Conversion entry point
// =============================================================================

/// Convert one raw cell into a typed value.
///
/// Returns `Ok(None)` for an empty cell on a nullable target (the field is
/// left untouched). An empty cell on a non-nullable target fails with
/// `RequiredFieldEmpty`, except booleans: the boolean rule never fails, so
/// an empty cell is simply not the true token and reads as `false`.
///
/// `Enumeration` cells pass through as text; member matching happens at the
/// accessor, which knows the member names.
pub fn convert(
    raw: &str,
    ty: SemanticType,
    nullable: bool,
    config: &ConvertConfig,
) -> ConvertResult<Option<TypedValue>> {
    if raw.trim().is_empty() {
        if ty == SemanticType::Boolean {
            return Ok(Some(TypedValue::Boolean(false)));
        }
        if nullable {
            return Ok(None);
        }
        return Err(ConvertError::RequiredFieldEmpty);
    }

    if let Some(converter) = config.converter(ty) {
        return converter(raw).map(Some);
    }

    let value = match ty {
        SemanticType::Text | SemanticType::Enumeration => TypedValue::Text(raw.to_string()),
        SemanticType::Integer => TypedValue::Integer(parse_integer(raw)?),
        SemanticType::Float => TypedValue::Float(parse_float(raw)?),
        SemanticType::Decimal => TypedValue::Decimal(parse_decimal(raw)?),
        SemanticType::Boolean => TypedValue::Boolean(parse_boolean(raw, config)),
        SemanticType::Date => TypedValue::Date(parse_date(raw, config)?),
        SemanticType::DateTime => TypedValue::DateTime(parse_datetime(raw, config)?),
    };
    Ok(Some(value))
}

// =============================================================================
// Built-in parsers
// =============================================================================

/// The configured true token (case-insensitive) is `true`; everything else,
/// including an empty cell, is `false`. Never fails.
pub fn parse_boolean(raw: &str, config: &ConvertConfig) -> bool {
    raw.trim().to_lowercase() == config.true_token.to_lowercase()
}

pub fn parse_integer(raw: &str) -> ConvertResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| ConvertError::failed(raw, SemanticType::Integer, e.to_string()))
}

/// Locale-tolerant decimal parsing; see the module docs for the policy.
pub fn parse_decimal(raw: &str) -> ConvertResult<Decimal> {
    parse_number(raw, SemanticType::Decimal, |s| Decimal::from_str(s).ok())
}

/// Same separator policy as [`parse_decimal`], for `f64` targets.
pub fn parse_float(raw: &str) -> ConvertResult<f64> {
    parse_number(raw, SemanticType::Float, |s| f64::from_str(s).ok())
}

fn parse_number<N>(
    raw: &str,
    target: SemanticType,
    parse: impl Fn(&str) -> Option<N>,
) -> ConvertResult<N> {
    let cleaned = NON_NUMERIC.replace_all(raw.trim(), "");
    if cleaned.is_empty() {
        return Err(ConvertError::failed(raw, target, "no digits"));
    }

    // Option's ordering makes a missing separator compare below any index.
    let comma_is_decimal = cleaned.rfind(',') > cleaned.rfind('.');
    let attempt = |decimal_sep: char, group_sep: char| {
        parse(&to_invariant(&cleaned, decimal_sep, group_sep))
    };

    let parsed = if comma_is_decimal {
        attempt(',', '.')
    } else {
        attempt('.', ',').or_else(|| attempt(',', '.'))
    };

    parsed.ok_or_else(|| ConvertError::failed(raw, target, "unparseable number"))
}

/// Drop grouping separators and canonicalize the decimal separator to `.`.
fn to_invariant(cleaned: &str, decimal_sep: char, group_sep: char) -> String {
    cleaned
        .chars()
        .filter(|c| *c != group_sep)
        .map(|c| if c == decimal_sep { '.' } else { c })
        .collect()
}

/// Render a decimal with the configured decimal separator, such that
/// [`parse_decimal`] reads it back to the same value.
pub fn format_decimal(value: &Decimal, config: &ConvertConfig) -> String {
    let text = value.to_string();
    if config.decimal_separator == '.' {
        text
    } else {
        text.replace('.', &config.decimal_separator.to_string())
    }
}

/// Exact-format date parse using the configured format.
pub fn parse_date(raw: &str, config: &ConvertConfig) -> ConvertResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), &config.date_format)
        .map_err(|e| ConvertError::failed(raw, SemanticType::Date, e.to_string()))
}

/// Exact-format datetime parse using the configured format.
pub fn parse_datetime(raw: &str, config: &ConvertConfig) -> ConvertResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), &config.datetime_format)
        .map_err(|e| ConvertError::failed(raw, SemanticType::DateTime, e.to_string()))
}

/// Case-insensitive match of a raw cell against enumeration member names.
/// Returns the index of the matching member.
pub fn match_enum_member<'a>(
    raw: &str,
    members: impl IntoIterator<Item = &'a str>,
) -> Option<usize> {
    let wanted = raw.trim();
    members
        .into_iter()
        .position(|m| m.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_decimal_comma_last_is_regional() {
        assert_eq!(parse_decimal("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_decimal("1234,56").unwrap(), dec("1234.56"));
    }

    #[test]
    fn test_decimal_invariant_first() {
        assert_eq!(parse_decimal("1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_decimal("1234.56").unwrap(), dec("1234.56"));
    }

    #[test]
    fn test_decimal_currency_noise_stripped() {
        assert_eq!(parse_decimal("R$ 10,50").unwrap(), dec("10.50"));
        assert_eq!(parse_decimal(" -1.000,25 ").unwrap(), dec("-1000.25"));
    }

    #[test]
    fn test_decimal_invariant_fallback() {
        // Invariant parse chokes on two dots; the comma-decimal attempt
        // treats them as grouping.
        assert_eq!(parse_decimal("1.234.567").unwrap(), dec("1234567"));
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("").is_err());
    }

    #[test]
    fn test_decimal_format_round_trip() {
        let comma = ConvertConfig::new().with_decimal_separator(',');
        let dot = ConvertConfig::new();
        for text in ["1234.56", "-0.5", "10", "0.001"] {
            let value = dec(text);
            assert_eq!(parse_decimal(&format_decimal(&value, &comma)).unwrap(), value);
            assert_eq!(parse_decimal(&format_decimal(&value, &dot)).unwrap(), value);
        }
    }

    #[test]
    fn test_boolean_token() {
        let config = ConvertConfig::new();
        assert!(parse_boolean("SIM", &config));
        assert!(parse_boolean("sim", &config));
        assert!(!parse_boolean("NAO", &config));
        assert!(!parse_boolean("", &config));
        assert!(!parse_boolean("true", &config));

        let english = ConvertConfig::new().with_true_token("yes");
        assert!(parse_boolean("YES", &english));
        assert!(!parse_boolean("SIM", &english));
    }

    #[test]
    fn test_boolean_empty_never_fails() {
        let config = ConvertConfig::new();
        let value = convert("", SemanticType::Boolean, false, &config).unwrap();
        assert_eq!(value, Some(TypedValue::Boolean(false)));
    }

    #[test]
    fn test_empty_required_vs_nullable() {
        let config = ConvertConfig::new();
        assert!(matches!(
            convert("", SemanticType::Integer, false, &config),
            Err(ConvertError::RequiredFieldEmpty)
        ));
        assert_eq!(convert("  ", SemanticType::Decimal, true, &config).unwrap(), None);
        assert_eq!(convert("", SemanticType::Text, true, &config).unwrap(), None);
    }

    #[test]
    fn test_date_exact_format() {
        let config = ConvertConfig::new();
        assert_eq!(
            parse_date("20/01/2025", &config).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
        );
        assert!(parse_date("2025-01-20", &config).is_err());

        let iso = ConvertConfig::new().with_date_format("%Y-%m-%d");
        assert!(parse_date("2025-01-20", &iso).is_ok());
    }

    #[test]
    fn test_converter_override_takes_precedence() {
        let config = ConvertConfig::new().with_converter(SemanticType::Integer, |raw| {
            // Strip a unit suffix the built-in parser would reject.
            parse_integer(raw.trim_end_matches("kg")).map(TypedValue::Integer)
        });
        let value = convert("25kg", SemanticType::Integer, false, &config).unwrap();
        assert_eq!(value, Some(TypedValue::Integer(25)));
    }

    #[test]
    fn test_enum_member_match() {
        let members = ["National", "Imported"];
        assert_eq!(match_enum_member("imported", members), Some(1));
        assert_eq!(match_enum_member(" NATIONAL ", members), Some(0));
        assert_eq!(match_enum_member("other", members), None);
    }

    #[test]
    fn test_integer_parse() {
        assert_eq!(parse_integer(" 42 ").unwrap(), 42);
        assert_eq!(parse_integer("-7").unwrap(), -7);
        assert!(parse_integer("4.2").is_err());
    }
}
