use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::CollectionId;
use crate::error::TypeError;
use crate::identity::EntityId;

/// Object-safe view of a stored entity.
///
/// The store keeps entities as `Arc<dyn Entity>` so that one map can hold
/// every collection. Typed code goes through [`Model`] and [`downcast`].
pub trait Entity: fmt::Debug + Send + Sync + 'static {
    /// Collection this entity belongs to.
    fn collection(&self) -> CollectionId;

    /// Identity within the collection, `None` while unassigned.
    fn id(&self) -> Option<EntityId>;

    /// Transport/cache form of this entity.
    fn to_json(&self) -> Result<Value, TypeError>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A typed entity with a compile-time collection and a serde representation.
///
/// Every `Model` is an [`Entity`] through a blanket implementation.
pub trait Model: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Collection string, e.g. `"motions/motion"`.
    const COLLECTION: &'static str;

    /// Identity of this instance, `None` while unassigned.
    fn identity(&self) -> Option<EntityId>;

    fn collection_id() -> CollectionId {
        CollectionId::from_static(Self::COLLECTION)
    }

    /// Build an instance from a raw transport payload.
    fn from_json(payload: Value) -> Result<Self, TypeError> {
        Ok(serde_json::from_value(payload)?)
    }
}

impl<M: Model> Entity for M {
    fn collection(&self) -> CollectionId {
        M::collection_id()
    }

    fn id(&self) -> Option<EntityId> {
        self.identity()
    }

    fn to_json(&self) -> Result<Value, TypeError> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Recover the concrete model behind a type-erased entity.
pub fn downcast<M: Model>(entity: Arc<dyn Entity>) -> Option<Arc<M>> {
    entity.into_any().downcast::<M>().ok()
}

/// Information about a removed entity. The payload no longer exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub collection: CollectionId,
    pub id: EntityId,
}

impl DeletedRecord {
    pub fn new(collection: CollectionId, id: EntityId) -> Self {
        Self { collection, id }
    }
}

/// Schemaless entity for collections registered at runtime.
///
/// The payload is kept verbatim; only the `id` field is interpreted.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEntity {
    collection: CollectionId,
    id: EntityId,
    payload: Value,
}

impl RawEntity {
    /// Wrap a raw payload. The payload must be an object with an assigned `id`.
    pub fn from_json(collection: CollectionId, payload: Value) -> Result<Self, TypeError> {
        if !payload.is_object() {
            return Err(TypeError::NotAnObject {
                collection: collection.to_string(),
                found: json_kind(&payload).to_string(),
            });
        }
        let id = EntityId::from_payload(&payload).ok_or_else(|| TypeError::MissingId {
            collection: collection.to_string(),
        })?;
        Ok(Self {
            collection,
            id,
            payload,
        })
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Top-level field of the payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

impl Entity for RawEntity {
    fn collection(&self) -> CollectionId {
        self.collection.clone()
    }

    fn id(&self) -> Option<EntityId> {
        Some(self.id.clone())
    }

    fn to_json(&self) -> Result<Value, TypeError> {
        Ok(self.payload.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
