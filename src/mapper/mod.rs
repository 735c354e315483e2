//! The header mapper: a per-model registry of header→field bindings,
//! static/computed defaults, and reference resolvers.
//!
//! A [`HeaderMap`] is built once (single-threaded registration, usually in
//! a constructor function per model) and reused read-only across any number
//! of bind calls, possibly from several threads. Headers are matched
//! case-insensitively. Registering the same header twice overwrites the
//! earlier binding; the same holds for static bindings per field name.
//!
//! # Example
//!
//! ```rust,ignore
//! let mapper = HeaderMap::new("material")
//!     .map("Codigo do Material", FieldAccessor::text("client_code", |m: &mut Material, v| m.client_code = v))
//!     .map("NCM", FieldAccessor::optional_integer("ncm", |m, v| m.ncm = Some(v)))
//!     .set_static("batch", batch_tag, |m: &mut Material, v| m.batch = v)
//!     .set_computed("guid", new_row_id, |m: &mut Material, v| m.guid = v);
//! ```

pub mod accessor;

use std::collections::HashMap;
use std::sync::Arc;

pub use accessor::FieldAccessor;

use accessor::{AccessorCache, CompiledAccessor};

/// A default applied to every produced instance.
struct StaticBinding<T> {
    field: String,
    apply: Arc<dyn Fn(&mut T) + Send + Sync>,
}

/// A reference resolver coupled with its typed assignment.
struct ReferenceBinding<T> {
    /// Returns whether the lookup produced a match (and assigned it).
    resolve: Arc<dyn Fn(&mut T, &str) -> bool + Send + Sync>,
}

/// Declarative registry binding column headers to fields of one model type.
pub struct HeaderMap<T> {
    name: String,
    /// Keyed by lowercased header; the entry keeps the registered spelling.
    mappings: HashMap<String, (String, FieldAccessor<T>)>,
    statics: Vec<StaticBinding<T>>,
    resolvers: HashMap<String, ReferenceBinding<T>>,
    create: Arc<dyn Fn() -> T + Send + Sync>,
    special: Option<Arc<dyn Fn(&mut T, &str, &str) + Send + Sync>>,
    cache: AccessorCache<T>,
}

impl<T: Default + 'static> HeaderMap<T> {
    /// A mapper whose instances are default-constructed.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_create(name, T::default)
    }
}

impl<T: 'static> HeaderMap<T> {
    /// A mapper with a custom instance factory, for models that must be
    /// pre-populated (nested request objects, fixed relations) before
    /// field-by-field mapping begins.
    pub fn with_create(name: impl Into<String>, create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            mappings: HashMap::new(),
            statics: Vec::new(),
            resolvers: HashMap::new(),
            create: Arc::new(create),
            special: None,
            cache: AccessorCache::new(),
        }
    }

    /// Bind a header to a field accessor. Later registrations for the same
    /// header win. Panics on an empty header name: that is a programmer
    /// error, caught at registration, not at bind time.
    pub fn map(mut self, header: &str, accessor: FieldAccessor<T>) -> Self {
        assert!(!header.trim().is_empty(), "header name must not be empty");
        self.mappings
            .insert(header.to_lowercase(), (header.to_string(), accessor));
        self
    }

    /// Register a fixed value applied to every produced instance
    /// (batch tags, fixed relations). The value is cloned per instance.
    pub fn set_static<V>(
        mut self,
        field: &str,
        value: V,
        assign: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        self.push_static(field, move |model| assign(model, value.clone()));
        self
    }

    /// Register a factory re-evaluated once per instance (generated
    /// identifiers, creation timestamps).
    pub fn set_computed<V>(
        mut self,
        field: &str,
        factory: impl Fn() -> V + Send + Sync + 'static,
        assign: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Send + Sync + 'static,
    {
        self.push_static(field, move |model| assign(model, factory()));
        self
    }

    fn push_static(&mut self, field: &str, apply: impl Fn(&mut T) + Send + Sync + 'static) {
        assert!(!field.trim().is_empty(), "field name must not be empty");
        self.statics.retain(|b| b.field != field);
        self.statics.push(StaticBinding {
            field: field.to_string(),
            apply: Arc::new(apply),
        });
    }

    /// Register a reference resolver for a header: the cell value is a key
    /// into already-materialized entities rather than a primitive. When the
    /// lookup matches, the entity is assigned and plain value conversion is
    /// skipped for that header.
    pub fn map_reference<R>(
        mut self,
        header: &str,
        lookup: impl Fn(&str) -> Option<R> + Send + Sync + 'static,
        assign: impl Fn(&mut T, R) + Send + Sync + 'static,
    ) -> Self
    where
        R: 'static,
    {
        assert!(!header.trim().is_empty(), "header name must not be empty");
        let resolve = move |model: &mut T, raw: &str| -> bool {
            match lookup(raw) {
                Some(entity) => {
                    assign(model, entity);
                    true
                }
                None => false,
            }
        };
        self.resolvers.insert(
            header.to_lowercase(),
            ReferenceBinding {
                resolve: Arc::new(resolve),
            },
        );
        self
    }

    /// Hook invoked for every header/value pair after standard mapping and
    /// resolution, for side effects not expressible as one field assignment.
    pub fn with_special(
        mut self,
        special: impl Fn(&mut T, &str, &str) + Send + Sync + 'static,
    ) -> Self {
        self.special = Some(Arc::new(special));
        self
    }

    // -- read-only surface, safe for concurrent use after registration -----

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce a new, empty model instance.
    pub fn create_instance(&self) -> T {
        (self.create)()
    }

    /// The accessor mapped to a header, if any (case-insensitive).
    pub fn mapping(&self, header: &str) -> Option<&FieldAccessor<T>> {
        self.mappings
            .get(&header.to_lowercase())
            .map(|(_, accessor)| accessor)
    }

    pub fn contains_header(&self, header: &str) -> bool {
        self.mappings.contains_key(&header.to_lowercase())
    }

    /// All registered headers, in their original spelling.
    pub fn mapped_headers(&self) -> impl Iterator<Item = &str> {
        self.mappings.values().map(|(spelling, _)| spelling.as_str())
    }

    pub fn has_resolver(&self, header: &str) -> bool {
        self.resolvers.contains_key(&header.to_lowercase())
    }

    /// Run the reference resolver for a header against a raw cell value.
    ///
    /// `None` when no resolver is registered for the header; otherwise
    /// whether the lookup matched (and the entity was assigned).
    pub fn resolve_reference(&self, model: &mut T, header: &str, raw: &str) -> Option<bool> {
        self.resolvers
            .get(&header.to_lowercase())
            .map(|binding| (binding.resolve)(model, raw))
    }

    /// Apply every registered static/computed value to an instance, in
    /// registration order.
    pub fn apply_static_values(&self, model: &mut T) {
        for binding in &self.statics {
            (binding.apply)(model);
        }
    }

    /// Invoke the special-mappings hook, if one is registered.
    pub fn apply_special(&self, model: &mut T, header: &str, raw: &str) {
        if let Some(special) = &self.special {
            special(model, header, raw);
        }
    }

    pub(crate) fn compiled(&self, accessor: &FieldAccessor<T>) -> Arc<CompiledAccessor<T>> {
        self.cache.resolve(accessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct User {
        code: String,
        group: String,
        profile: Option<String>,
        stamp: u32,
    }

    #[test]
    fn test_mapping_lookup_is_case_insensitive() {
        let mapper = HeaderMap::new("user")
            .map("ClientCode", FieldAccessor::text("code", |u: &mut User, v| u.code = v));
        assert!(mapper.contains_header("clientcode"));
        assert!(mapper.contains_header("CLIENTCODE"));
        assert!(mapper.mapping("clientCode").is_some());
        assert!(mapper.mapping("other").is_none());
    }

    #[test]
    fn test_later_mapping_wins() {
        let mapper = HeaderMap::new("user")
            .map("Code", FieldAccessor::text("code", |u: &mut User, v| u.code = v))
            .map("code", FieldAccessor::text("group", |u: &mut User, v| u.group = v));
        let accessor = mapper.mapping("CODE").unwrap();
        assert_eq!(accessor.name(), "group");
    }

    #[test]
    fn test_static_values_apply_in_order_with_overwrite() {
        let mapper = HeaderMap::new("user")
            .set_static("group", "first".to_string(), |u: &mut User, v| u.group = v)
            .set_static("group", "second".to_string(), |u: &mut User, v| u.group = v);
        let mut user = User::default();
        mapper.apply_static_values(&mut user);
        assert_eq!(user.group, "second");
    }

    #[test]
    fn test_computed_value_reevaluated_per_instance() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let counter = Arc::new(AtomicU32::new(0));
        let source = counter.clone();
        let mapper = HeaderMap::new("user").set_computed(
            "stamp",
            move || source.fetch_add(1, Ordering::SeqCst),
            |u: &mut User, v| u.stamp = v,
        );

        let mut a = User::default();
        let mut b = User::default();
        mapper.apply_static_values(&mut a);
        mapper.apply_static_values(&mut b);
        assert_eq!(a.stamp, 0);
        assert_eq!(b.stamp, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reference_resolution() {
        let known = vec!["P1".to_string(), "P2".to_string()];
        let mapper = HeaderMap::new("user").map_reference(
            "Profile",
            move |raw| known.iter().find(|p| p.eq_ignore_ascii_case(raw)).cloned(),
            |u: &mut User, p| u.profile = Some(p),
        );

        let mut user = User::default();
        assert_eq!(mapper.resolve_reference(&mut user, "profile", "p1"), Some(true));
        assert_eq!(user.profile.as_deref(), Some("P1"));
        assert_eq!(mapper.resolve_reference(&mut user, "Profile", "zz"), Some(false));
        assert_eq!(mapper.resolve_reference(&mut user, "Other", "p1"), None);
    }

    #[test]
    fn test_custom_create_instance() {
        let mapper = HeaderMap::with_create("user", || User {
            group: "preset".into(),
            ..User::default()
        });
        assert_eq!(mapper.create_instance().group, "preset");
    }

    #[test]
    #[should_panic(expected = "header name must not be empty")]
    fn test_empty_header_panics_at_registration() {
        let _ = HeaderMap::new("user")
            .map("", FieldAccessor::text("code", |u: &mut User, v| u.code = v));
    }

    #[test]
    fn test_mapper_is_shareable_across_threads() {
        let mapper = Arc::new(HeaderMap::new("user").map(
            "Code",
            FieldAccessor::text("code", |u: &mut User, v| u.code = v),
        ));
        let other = mapper.clone();
        let handle = std::thread::spawn(move || other.contains_header("code"));
        assert!(handle.join().unwrap());
        assert!(mapper.contains_header("CODE"));
    }
}
