//! Client-side object store for Quorum.
//!
//! The [`DataStore`] holds every entity the client knows about, indexed by
//! collection and id. It keeps a live copy for readers and a serialized copy
//! for the persistent cache, and broadcasts every change and deletion to its
//! subscribers (the repositories).
//!
//! # Components
//!
//! - [`Registry`] -- maps collection strings to decoders. Built from a static
//!   table of [`ModelDescriptor`]s with a runtime fallback for late-bound
//!   collections.
//! - [`Emitter`] -- synchronous multicast without replay.
//! - [`CacheAdapter`] -- key-value persistence; [`InMemoryCache`] and
//!   [`FileCache`] are provided.
//! - [`DataStore`] -- the store itself.
//! - [`Autoupdater`] -- applies server autoupdate messages in order.
//!
//! # Rules
//!
//! 1. Both maps change together; no reader sees one updated without the other.
//! 2. An `add` or `remove` call persists exactly once, after all its events fired.
//! 3. The change counter never decreases.
//! 4. Lookup misses are empty results, never errors.
//! 5. Cache backend errors propagate; the store never retries.

pub mod autoupdate;
pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod registry;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use autoupdate::{AutoupdateFormat, AutoupdateOutcome, Autoupdater};
pub use cache::{CacheAdapter, FileCache, InMemoryCache};
pub use config::StoreConfig;
pub use emitter::{Emitter, ListenerId};
pub use error::{StoreError, StoreResult};
pub use registry::{DecodeFn, ModelDescriptor, Registration, Registry};
pub use store::{ChangeEvent, DataStore};
