//! Mapping from collection strings to the types that decode them.
//!
//! Known entity types are listed in a static table of [`ModelDescriptor`]s
//! compiled into the application. Plugins and tooling may add further
//! collections at runtime; those live in a fallback table that shadows the
//! static one.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use quorum_types::{CollectionId, Entity, Model, RawEntity, TypeError};
use serde_json::Value;
use tracing::{debug, warn};

/// Decoder turning a raw payload of a collection into a typed entity.
pub type DecodeFn = fn(&CollectionId, Value) -> Result<Arc<dyn Entity>, TypeError>;

/// Describes one entity type: its collection and how to decode it.
#[derive(Clone)]
pub struct ModelDescriptor {
    collection: CollectionId,
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    decode: DecodeFn,
}

impl ModelDescriptor {
    /// Descriptor of a typed model. Usable in `static` tables.
    pub const fn of<M: Model>() -> Self {
        Self {
            collection: CollectionId::from_static(M::COLLECTION),
            type_id: TypeId::of::<M>,
            type_name: type_name::<M>,
            decode: decode_model::<M>,
        }
    }

    /// Descriptor binding `collection` to the schemaless [`RawEntity`].
    pub fn raw(collection: impl Into<CollectionId>) -> Self {
        Self {
            collection: collection.into(),
            type_id: TypeId::of::<RawEntity>,
            type_name: type_name::<RawEntity>,
            decode: decode_raw,
        }
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Decode a raw payload of this collection.
    pub fn decode(&self, payload: Value) -> Result<Arc<dyn Entity>, TypeError> {
        (self.decode)(&self.collection, payload)
    }

    fn same_type(&self, other: &ModelDescriptor) -> bool {
        self.type_id() == other.type_id()
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("collection", &self.collection)
            .field("type", &self.type_name())
            .finish()
    }
}

fn decode_model<M: Model>(
    _collection: &CollectionId,
    payload: Value,
) -> Result<Arc<dyn Entity>, TypeError> {
    Ok(Arc::new(M::from_json(payload)?))
}

fn decode_raw(collection: &CollectionId, payload: Value) -> Result<Arc<dyn Entity>, TypeError> {
    Ok(Arc::new(RawEntity::from_json(collection.clone(), payload)?))
}

/// Outcome of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The collection was unknown and is now registered.
    Added,
    /// The same type was already registered for the collection.
    Unchanged,
    /// A different type was registered before and has been overwritten.
    Replaced { previous: &'static str },
}

/// Collection string ↔ entity type registry.
///
/// Populated once at bootstrap and shared by `Arc` for the rest of the
/// process. Lookups of unknown collections return `None`; callers skip such
/// data rather than fail.
pub struct Registry {
    builtin: &'static [ModelDescriptor],
    late: RwLock<HashMap<CollectionId, ModelDescriptor>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_models(&[])
    }

    /// Create a registry backed by a compiled-in table.
    pub fn with_models(table: &'static [ModelDescriptor]) -> Self {
        Self {
            builtin: table,
            late: RwLock::new(HashMap::new()),
        }
    }

    /// Register a descriptor at runtime.
    ///
    /// Re-registering the same type is a no-op. Registering a different type
    /// for a known collection logs a warning and overwrites the old binding.
    pub fn register(&self, descriptor: ModelDescriptor) -> Registration {
        let existing = self.resolve(descriptor.collection.as_str());
        let outcome = match existing {
            Some(ref current) if current.same_type(&descriptor) => Registration::Unchanged,
            Some(ref current) => {
                warn!(
                    collection = %descriptor.collection,
                    previous = current.type_name(),
                    replacement = descriptor.type_name(),
                    "collection registered twice with different types"
                );
                Registration::Replaced {
                    previous: current.type_name(),
                }
            }
            None => Registration::Added,
        };

        if outcome != Registration::Unchanged {
            debug!(collection = %descriptor.collection, ty = descriptor.type_name(), "registered collection");
            self.late
                .write()
                .expect("registry lock poisoned")
                .insert(descriptor.collection.clone(), descriptor);
        }
        outcome
    }

    /// Register a typed model at runtime.
    pub fn register_model<M: Model>(&self) -> Registration {
        self.register(ModelDescriptor::of::<M>())
    }

    /// Register a late-bound collection decoded as [`RawEntity`].
    pub fn register_raw(&self, collection: impl Into<CollectionId>) -> Registration {
        self.register(ModelDescriptor::raw(collection))
    }

    /// Look up the descriptor of a collection.
    pub fn resolve(&self, collection: &str) -> Option<ModelDescriptor> {
        if let Some(found) = self
            .late
            .read()
            .expect("registry lock poisoned")
            .get(collection)
        {
            return Some(found.clone());
        }
        self.builtin
            .iter()
            .find(|d| d.collection.as_str() == collection)
            .cloned()
    }

    /// Reverse lookup: the collection bound to a type.
    ///
    /// Scans every registered entry; registration only happens at startup so
    /// the linear cost is irrelevant.
    pub fn resolve_collection_id(&self, type_id: TypeId) -> Option<CollectionId> {
        let late = self.late.read().expect("registry lock poisoned");
        if let Some(found) = late.values().find(|d| d.type_id() == type_id) {
            return Some(found.collection.clone());
        }
        self.builtin
            .iter()
            .filter(|d| !late.contains_key(d.collection.as_str()))
            .find(|d| d.type_id() == type_id)
            .map(|d| d.collection.clone())
    }

    /// Reverse lookup for a typed model.
    pub fn collection_of<M: Model>(&self) -> Option<CollectionId> {
        self.resolve_collection_id(TypeId::of::<M>())
    }

    pub fn is_registered(&self, collection: &str) -> bool {
        self.resolve(collection).is_some()
    }

    /// Decode a payload of `collection`, or `None` if the collection is unknown.
    pub fn decode(
        &self,
        collection: &str,
        payload: Value,
    ) -> Option<Result<Arc<dyn Entity>, TypeError>> {
        self.resolve(collection).map(|d| d.decode(payload))
    }

    /// All registered collections, sorted.
    pub fn collections(&self) -> Vec<CollectionId> {
        let late = self.late.read().expect("registry lock poisoned");
        let mut all: Vec<CollectionId> = self
            .builtin
            .iter()
            .map(|d| d.collection.clone())
            .chain(late.keys().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("collections", &self.collections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Gadget, Widget};
    use quorum_types::{downcast, EntityId};
    use serde_json::json;

    static TABLE: &[ModelDescriptor] = &[ModelDescriptor::of::<Widget>()];

    #[test]
    fn static_table_resolves() {
        let registry = Registry::with_models(TABLE);
        let d = registry.resolve("demo/widget").expect("widget registered");
        assert_eq!(d.type_id(), TypeId::of::<Widget>());
        assert!(registry.resolve("demo/unknown").is_none());
    }

    #[test]
    fn decode_builds_typed_entity() {
        let registry = Registry::with_models(TABLE);
        let entity = registry
            .decode("demo/widget", json!({"id": 3, "name": "C"}))
            .expect("registered")
            .expect("valid payload");
        let widget = downcast::<Widget>(entity).expect("is a widget");
        assert_eq!(widget.name, "C");
        assert!(registry.decode("demo/unknown", json!({"id": 1})).is_none());
    }

    #[test]
    fn reregistering_same_type_is_noop() {
        let registry = Registry::with_models(TABLE);
        assert_eq!(registry.register_model::<Widget>(), Registration::Unchanged);
        assert_eq!(registry.register_model::<Gadget>(), Registration::Added);
        assert_eq!(registry.register_model::<Gadget>(), Registration::Unchanged);
    }

    #[test]
    fn conflicting_registration_overwrites() {
        let registry = Registry::with_models(TABLE);
        let outcome = registry.register(ModelDescriptor::raw("demo/widget"));
        assert!(matches!(outcome, Registration::Replaced { .. }));

        let d = registry.resolve("demo/widget").unwrap();
        assert_eq!(d.type_id(), TypeId::of::<RawEntity>());
        // The shadowed static entry no longer answers reverse lookups.
        assert_eq!(registry.collection_of::<Widget>(), None);
    }

    #[test]
    fn reverse_lookup() {
        let registry = Registry::with_models(TABLE);
        assert_eq!(
            registry.collection_of::<Widget>(),
            Some(CollectionId::from_static("demo/widget"))
        );
        assert_eq!(registry.collection_of::<Gadget>(), None);
        registry.register_model::<Gadget>();
        assert_eq!(
            registry.collection_of::<Gadget>(),
            Some(CollectionId::from_static("demo/gadget"))
        );
    }

    #[test]
    fn raw_collections_keep_payload() {
        let registry = Registry::new();
        registry.register_raw(CollectionId::new("plugin/poll"));
        let entity = registry
            .decode("plugin/poll", json!({"id": "p1", "open": true}))
            .unwrap()
            .unwrap();
        assert_eq!(entity.id(), Some(EntityId::from("p1")));
        assert_eq!(entity.to_json().unwrap(), json!({"id": "p1", "open": true}));
    }

    #[test]
    fn collections_are_sorted_and_unique() {
        let registry = Registry::with_models(TABLE);
        registry.register_model::<Gadget>();
        registry.register_model::<Widget>();
        let names: Vec<String> = registry.collections().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["demo/gadget", "demo/widget"]);
    }
}
