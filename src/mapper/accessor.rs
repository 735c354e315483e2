//! Field accessors: opaque, reflection-free handles to writable model fields.
//!
//! An accessor pairs a logical field name and a semantic type tag with a
//! typed assignment closure. At bind time each accessor is compiled once
//! into a uniform "apply a [`TypedValue`]" closure; compiled accessors are
//! kept in a lock-protected cache owned by the mapper, so concurrent binds
//! sharing one mapper may duplicate the compilation but never observe
//! divergent entries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::convert::{match_enum_member, SemanticType, TypedValue};
use crate::error::{ConvertError, ConvertResult};

type Assign<T, V> = Arc<dyn Fn(&mut T, V) + Send + Sync>;

/// The typed assignment a constructor captured.
enum RawAssign<T> {
    Text(Assign<T, String>),
    Integer(Assign<T, i64>),
    Float(Assign<T, f64>),
    Decimal(Assign<T, Decimal>),
    Boolean(Assign<T, bool>),
    Date(Assign<T, NaiveDate>),
    DateTime(Assign<T, NaiveDateTime>),
    /// Matches the raw text against member names; `false` means no member.
    Enumeration(Arc<dyn Fn(&mut T, &str) -> bool + Send + Sync>),
}

impl<T> Clone for RawAssign<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Text(f) => Self::Text(f.clone()),
            Self::Integer(f) => Self::Integer(f.clone()),
            Self::Float(f) => Self::Float(f.clone()),
            Self::Decimal(f) => Self::Decimal(f.clone()),
            Self::Boolean(f) => Self::Boolean(f.clone()),
            Self::Date(f) => Self::Date(f.clone()),
            Self::DateTime(f) => Self::DateTime(f.clone()),
            Self::Enumeration(f) => Self::Enumeration(f.clone()),
        }
    }
}

/// An opaque handle identifying one writable field on a model type.
///
/// Constructed through the typed constructors below. `optional_` variants
/// mark the field nullable: an empty cell leaves it untouched instead of
/// raising `RequiredFieldEmpty`. Text fields are always nullable, and
/// booleans never fail on empty input, so neither has a required variant.
///
/// Field names are the cache key for accessor resolution and must be
/// unique within one mapper.
pub struct FieldAccessor<T> {
    name: String,
    ty: SemanticType,
    nullable: bool,
    assign: RawAssign<T>,
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            ty: self.ty,
            nullable: self.nullable,
            assign: self.assign.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("nullable", &self.nullable)
            .finish()
    }
}

impl<T> FieldAccessor<T> {
    fn build(
        name: impl Into<String>,
        ty: SemanticType,
        nullable: bool,
        assign: RawAssign<T>,
    ) -> Self {
        let name = name.into();
        assert!(!name.trim().is_empty(), "field name must not be empty");
        Self {
            name,
            ty,
            nullable,
            assign,
        }
    }

    pub fn text(name: impl Into<String>, set: impl Fn(&mut T, String) + Send + Sync + 'static) -> Self {
        Self::build(name, SemanticType::Text, true, RawAssign::Text(Arc::new(set)))
    }

    pub fn integer(name: impl Into<String>, set: impl Fn(&mut T, i64) + Send + Sync + 'static) -> Self {
        Self::build(name, SemanticType::Integer, false, RawAssign::Integer(Arc::new(set)))
    }

    pub fn optional_integer(
        name: impl Into<String>,
        set: impl Fn(&mut T, i64) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Integer, true, RawAssign::Integer(Arc::new(set)))
    }

    pub fn float(name: impl Into<String>, set: impl Fn(&mut T, f64) + Send + Sync + 'static) -> Self {
        Self::build(name, SemanticType::Float, false, RawAssign::Float(Arc::new(set)))
    }

    pub fn optional_float(
        name: impl Into<String>,
        set: impl Fn(&mut T, f64) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Float, true, RawAssign::Float(Arc::new(set)))
    }

    pub fn decimal(
        name: impl Into<String>,
        set: impl Fn(&mut T, Decimal) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Decimal, false, RawAssign::Decimal(Arc::new(set)))
    }

    pub fn optional_decimal(
        name: impl Into<String>,
        set: impl Fn(&mut T, Decimal) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Decimal, true, RawAssign::Decimal(Arc::new(set)))
    }

    pub fn boolean(name: impl Into<String>, set: impl Fn(&mut T, bool) + Send + Sync + 'static) -> Self {
        Self::build(name, SemanticType::Boolean, false, RawAssign::Boolean(Arc::new(set)))
    }

    pub fn date(
        name: impl Into<String>,
        set: impl Fn(&mut T, NaiveDate) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Date, false, RawAssign::Date(Arc::new(set)))
    }

    pub fn optional_date(
        name: impl Into<String>,
        set: impl Fn(&mut T, NaiveDate) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::Date, true, RawAssign::Date(Arc::new(set)))
    }

    pub fn date_time(
        name: impl Into<String>,
        set: impl Fn(&mut T, NaiveDateTime) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::DateTime, false, RawAssign::DateTime(Arc::new(set)))
    }

    pub fn optional_date_time(
        name: impl Into<String>,
        set: impl Fn(&mut T, NaiveDateTime) + Send + Sync + 'static,
    ) -> Self {
        Self::build(name, SemanticType::DateTime, true, RawAssign::DateTime(Arc::new(set)))
    }

    /// An enumeration field: the cell is matched case-insensitively against
    /// member names and the matching member value is assigned.
    pub fn enumeration<E>(
        name: impl Into<String>,
        members: Vec<(String, E)>,
        set: impl Fn(&mut T, E) + Send + Sync + 'static,
    ) -> Self
    where
        E: Clone + Send + Sync + 'static,
    {
        Self::enum_assign(name, false, members, set)
    }

    pub fn optional_enumeration<E>(
        name: impl Into<String>,
        members: Vec<(String, E)>,
        set: impl Fn(&mut T, E) + Send + Sync + 'static,
    ) -> Self
    where
        E: Clone + Send + Sync + 'static,
    {
        Self::enum_assign(name, true, members, set)
    }

    fn enum_assign<E>(
        name: impl Into<String>,
        nullable: bool,
        members: Vec<(String, E)>,
        set: impl Fn(&mut T, E) + Send + Sync + 'static,
    ) -> Self
    where
        E: Clone + Send + Sync + 'static,
    {
        let matcher = move |model: &mut T, raw: &str| -> bool {
            match match_enum_member(raw, members.iter().map(|(n, _)| n.as_str())) {
                Some(index) => {
                    set(model, members[index].1.clone());
                    true
                }
                None => false,
            }
        };
        Self::build(
            name,
            SemanticType::Enumeration,
            nullable,
            RawAssign::Enumeration(Arc::new(matcher)),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

// =============================================================================
// Compiled accessors and the resolution cache
// =============================================================================

/// An accessor resolved into a uniform apply-typed-value closure.
pub(crate) struct CompiledAccessor<T> {
    pub(crate) apply: Arc<dyn Fn(&mut T, TypedValue) -> ConvertResult<()> + Send + Sync>,
}

fn compile<T>(accessor: &FieldAccessor<T>) -> CompiledAccessor<T>
where
    T: 'static,
{
    let declared = accessor.semantic_type();
    let apply: Arc<dyn Fn(&mut T, TypedValue) -> ConvertResult<()> + Send + Sync> =
        match accessor.assign.clone() {
            RawAssign::Text(set) => Arc::new(move |model, value| match value {
                TypedValue::Text(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Integer(set) => Arc::new(move |model, value| match value {
                TypedValue::Integer(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Float(set) => Arc::new(move |model, value| match value {
                TypedValue::Float(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Decimal(set) => Arc::new(move |model, value| match value {
                TypedValue::Decimal(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Boolean(set) => Arc::new(move |model, value| match value {
                TypedValue::Boolean(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Date(set) => Arc::new(move |model, value| match value {
                TypedValue::Date(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::DateTime(set) => Arc::new(move |model, value| match value {
                TypedValue::DateTime(v) => {
                    set(model, v);
                    Ok(())
                }
                other => Err(mismatch(declared, other)),
            }),
            RawAssign::Enumeration(matcher) => Arc::new(move |model, value| match value {
                TypedValue::Text(raw) => {
                    if matcher(model, &raw) {
                        Ok(())
                    } else {
                        Err(ConvertError::failed(
                            raw,
                            SemanticType::Enumeration,
                            "no matching member",
                        ))
                    }
                }
                other => Err(mismatch(declared, other)),
            }),
        };
    CompiledAccessor { apply }
}

/// An override converter produced a value of the wrong shape for the field.
fn mismatch(declared: SemanticType, got: TypedValue) -> ConvertError {
    ConvertError::failed(
        got.to_string(),
        declared,
        format!("converter produced a {} value", got.semantic_type()),
    )
}

/// Lazily populated, lock-protected map from field name to compiled
/// accessor. Owned by one mapper; never global. Races may compile twice,
/// but the first insertion wins and later lookups all see the same entry.
pub(crate) struct AccessorCache<T> {
    slots: RwLock<HashMap<String, Arc<CompiledAccessor<T>>>>,
}

impl<T: 'static> AccessorCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn resolve(&self, accessor: &FieldAccessor<T>) -> Arc<CompiledAccessor<T>> {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = slots.get(accessor.name()) {
                return hit.clone();
            }
        }
        let compiled = Arc::new(compile(accessor));
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(accessor.name().to_string())
            .or_insert(compiled)
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
