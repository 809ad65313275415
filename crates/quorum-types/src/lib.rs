//! Foundation types for the Quorum object store.
//!
//! Every other Quorum crate depends on `quorum-types`. The crate is free of
//! I/O and async code; it only describes what an entity is and how it is
//! addressed.
//!
//! # Key Types
//!
//! - [`CollectionId`]: Namespace of an entity type, e.g. `"motions/motion"`
//! - [`EntityId`]: Identity of an entity within its collection
//! - [`ChangeId`]: Monotonic synchronization point with the server
//! - [`Entity`]: Object-safe view of any stored entity
//! - [`Model`]: Typed, serde-backed entity with a compile-time collection
//! - [`DeletedRecord`]: `(collection, id)` pair emitted on removal
//! - [`RawEntity`]: Schemaless entity for late-bound collections

pub mod collection;
pub mod entity;
pub mod error;
pub mod identity;

pub use collection::{CollectionId, INVALID_COLLECTION};
pub use entity::{downcast, DeletedRecord, Entity, Model, RawEntity};
pub use error::TypeError;
pub use identity::{ChangeId, EntityId};
