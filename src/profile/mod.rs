//! Declarative bind profiles.
//!
//! A [`BindProfile`] is a JSON description of header→field bindings plus
//! locale options, compiled at load time into a [`HeaderMap`] over the
//! dynamic [`Record`] model. This is how the CLI exercises the full
//! binding pipeline against files whose model types were never compiled
//! into the binary.
//!
//! ```json
//! {
//!   "name": "price-list",
//!   "true_token": "SIM",
//!   "date_format": "%d/%m/%Y",
//!   "fields": [
//!     { "header": "Codigo do Material", "field": "code", "type": "text" },
//!     { "header": "Preço Unitário", "field": "unit_price", "type": "decimal" },
//!     { "header": "NCM", "type": "integer", "nullable": true }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convert::{ConvertConfig, SemanticType, TypedValue};
use crate::error::{ProfileError, ProfileResult};
use crate::mapper::{FieldAccessor, HeaderMap};

// =============================================================================
// The dynamic record model
// =============================================================================

/// A dynamically shaped model: field name → typed value.
///
/// Serializes flat, so a bound record renders as an ordinary JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    values: BTreeMap<String, TypedValue>,
}

impl Record {
    pub fn set(&mut self, field: &str, value: TypedValue) {
        self.values.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.values.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// =============================================================================
// Profile description
// =============================================================================

/// One header→field binding in a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column header in the source file.
    pub header: String,

    /// Destination field name; defaults to the header itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Semantic type of the destination field.
    #[serde(rename = "type")]
    pub ty: SemanticType,

    /// Whether an empty cell is acceptable (field left unset).
    #[serde(default)]
    pub nullable: bool,

    /// Member names, for enumeration fields only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl FieldSpec {
    fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.header)
    }
}

/// A complete declarative mapper description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindProfile {
    #[serde(default)]
    pub name: String,

    pub fields: Vec<FieldSpec>,

    /// Chrono format for date cells; default `%d/%m/%Y`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Chrono format for datetime cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_format: Option<String>,

    /// The single token read as boolean true; default `SIM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_token: Option<String>,

    /// Decimal separator used when formatting values back to text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<char>,
}

impl BindProfile {
    pub fn from_json(json: &str) -> ProfileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProfileResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> ProfileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The conversion config this profile's locale options describe.
    pub fn convert_config(&self) -> ConvertConfig {
        let mut config = ConvertConfig::new();
        if let Some(format) = &self.date_format {
            config = config.with_date_format(format.clone());
        }
        if let Some(format) = &self.datetime_format {
            config = config.with_datetime_format(format.clone());
        }
        if let Some(token) = &self.true_token {
            config = config.with_true_token(token.clone());
        }
        if let Some(separator) = self.decimal_separator {
            config = config.with_decimal_separator(separator);
        }
        config
    }

    /// Compile the profile into a header mapper over [`Record`].
    ///
    /// Malformed entries are data errors here (the profile is user input),
    /// not registration panics.
    pub fn header_map(&self) -> ProfileResult<HeaderMap<Record>> {
        let mut mapper = HeaderMap::new(if self.name.is_empty() {
            "profile"
        } else {
            self.name.as_str()
        });

        for (index, spec) in self.fields.iter().enumerate() {
            if spec.header.trim().is_empty() {
                return Err(ProfileError::EmptyHeader(index));
            }
            mapper = mapper.map(&spec.header, self.accessor(spec)?);
        }
        Ok(mapper)
    }

    fn accessor(&self, spec: &FieldSpec) -> ProfileResult<FieldAccessor<Record>> {
        let field = spec.field_name().to_string();
        let nullable = spec.nullable;

        macro_rules! setter {
            ($variant:ident) => {{
                let field = field.clone();
                move |record: &mut Record, value| {
                    record.set(&field, TypedValue::$variant(value))
                }
            }};
        }

        let accessor = match spec.ty {
            SemanticType::Text => FieldAccessor::text(field.as_str(), setter!(Text)),
            SemanticType::Integer if nullable => {
                FieldAccessor::optional_integer(field.as_str(), setter!(Integer))
            }
            SemanticType::Integer => FieldAccessor::integer(field.as_str(), setter!(Integer)),
            SemanticType::Float if nullable => {
                FieldAccessor::optional_float(field.as_str(), setter!(Float))
            }
            SemanticType::Float => FieldAccessor::float(field.as_str(), setter!(Float)),
            SemanticType::Decimal if nullable => {
                FieldAccessor::optional_decimal(field.as_str(), setter!(Decimal))
            }
            SemanticType::Decimal => FieldAccessor::decimal(field.as_str(), setter!(Decimal)),
            SemanticType::Boolean => FieldAccessor::boolean(field.as_str(), setter!(Boolean)),
            SemanticType::Date if nullable => FieldAccessor::optional_date(field.as_str(), setter!(Date)),
            SemanticType::Date => FieldAccessor::date(field.as_str(), setter!(Date)),
            SemanticType::DateTime if nullable => {
                FieldAccessor::optional_date_time(field.as_str(), setter!(DateTime))
            }
            SemanticType::DateTime => FieldAccessor::date_time(field.as_str(), setter!(DateTime)),
            SemanticType::Enumeration => {
                if spec.members.is_empty() {
                    return Err(ProfileError::NoMembers(field));
                }
                let members: Vec<(String, String)> = spec
                    .members
                    .iter()
                    .map(|m| (m.clone(), m.clone()))
                    .collect();
                let assign = {
                    let field = field.clone();
                    move |record: &mut Record, member: String| {
                        record.set(&field, TypedValue::Text(member))
                    }
                };
                if nullable {
                    FieldAccessor::optional_enumeration(field.as_str(), members, assign)
                } else {
                    FieldAccessor::enumeration(field.as_str(), members, assign)
                }
            }
        };
        Ok(accessor)
    }

    /// Headers the profile expects but the dataset does not provide.
    pub fn missing_headers(&self, headers: &[String]) -> Vec<String> {
        self.fields
            .iter()
            .map(|spec| &spec.header)
            .filter(|wanted| !headers.iter().any(|h| h.eq_ignore_ascii_case(wanted)))
            .cloned()
            .collect()
    }
}

/// A worked example profile, also used by `rowbind example-profile`.
pub fn example_profile() -> BindProfile {
    BindProfile {
        name: "price-list".to_string(),
        fields: vec![
            FieldSpec {
                header: "Codigo do Material".to_string(),
                field: Some("code".to_string()),
                ty: SemanticType::Text,
                nullable: false,
                members: vec![],
            },
            FieldSpec {
                header: "Descrição Material".to_string(),
                field: Some("description".to_string()),
                ty: SemanticType::Text,
                nullable: true,
                members: vec![],
            },
            FieldSpec {
                header: "NCM".to_string(),
                field: Some("ncm".to_string()),
                ty: SemanticType::Integer,
                nullable: true,
                members: vec![],
            },
            FieldSpec {
                header: "Preço Unitário Líquido".to_string(),
                field: Some("net_unit_price".to_string()),
                ty: SemanticType::Decimal,
                nullable: false,
                members: vec![],
            },
            FieldSpec {
                header: "Possui IPI".to_string(),
                field: Some("has_ipi".to_string()),
                ty: SemanticType::Boolean,
                nullable: false,
                members: vec![],
            },
            FieldSpec {
                header: "Data Cotação".to_string(),
                field: Some("quote_date".to_string()),
                ty: SemanticType::Date,
                nullable: true,
                members: vec![],
            },
            FieldSpec {
                header: "Origem".to_string(),
                field: Some("origin".to_string()),
                ty: SemanticType::Enumeration,
                nullable: true,
                members: vec!["Nacional".to_string(), "Importado".to_string()],
            },
        ],
        date_format: Some("%d/%m/%Y".to_string()),
        datetime_format: None,
        true_token: Some("SIM".to_string()),
        decimal_separator: Some(','),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TabularDataset;
    use crate::transform::ModelBinder;
    use crate::validate::NoValidation;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    #[test]
    fn test_profile_json_round_trip() {
        let profile = example_profile();
        let json = profile.to_json().unwrap();
        let parsed = BindProfile::from_json(&json).unwrap();
        assert_eq!(parsed.name, profile.name);
        assert_eq!(parsed.fields.len(), profile.fields.len());
        assert_eq!(parsed.fields[3].ty, SemanticType::Decimal);
    }

    #[test]
    fn test_profile_binds_records() {
        let profile = example_profile();
        let mapper = Arc::new(profile.header_map().unwrap());
        let binder = ModelBinder::new(mapper, NoValidation, profile.convert_config());

        let data = TabularDataset::with_rows(
            "quotes",
            vec![
                "Codigo do Material".into(),
                "Preço Unitário Líquido".into(),
                "Possui IPI".into(),
                "Origem".into(),
            ],
            vec![
                vec![
                    Some("MAT-1".into()),
                    Some("1.250,75".into()),
                    Some("sim".into()),
                    Some("importado".into()),
                ],
                vec![Some("MAT-2".into()), Some("".into()), None, None],
            ],
        );

        let result = binder.bind(&data);
        assert_eq!(result.line_results.len(), 2);
        assert_eq!(result.valid_models.len(), 1);

        let record = &result.valid_models[0];
        assert_eq!(record.get("code"), Some(&TypedValue::Text("MAT-1".into())));
        assert_eq!(
            record.get("net_unit_price"),
            Some(&TypedValue::Decimal(Decimal::from_str("1250.75").unwrap()))
        );
        assert_eq!(record.get("has_ipi"), Some(&TypedValue::Boolean(true)));
        // Canonical member spelling, not the cell's.
        assert_eq!(record.get("origin"), Some(&TypedValue::Text("Importado".into())));
    }

    #[test]
    fn test_profile_rejects_empty_header() {
        let mut profile = example_profile();
        profile.fields[0].header = "  ".to_string();
        assert!(matches!(
            profile.header_map(),
            Err(ProfileError::EmptyHeader(0))
        ));
    }

    #[test]
    fn test_profile_rejects_memberless_enumeration() {
        let mut profile = example_profile();
        profile.fields[6].members.clear();
        assert!(matches!(
            profile.header_map(),
            Err(ProfileError::NoMembers(_))
        ));
    }

    #[test]
    fn test_missing_headers_case_insensitive() {
        let profile = example_profile();
        let headers = vec![
            "CODIGO DO MATERIAL".to_string(),
            "preço unitário líquido".to_string(),
        ];
        let missing = profile.missing_headers(&headers);
        assert!(!missing.contains(&"Codigo do Material".to_string()));
        assert!(missing.contains(&"NCM".to_string()));
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut record = Record::default();
        record.set("code", TypedValue::Text("A1".into()));
        record.set("qty", TypedValue::Integer(3));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"code":"A1","qty":3}"#);
    }
}
