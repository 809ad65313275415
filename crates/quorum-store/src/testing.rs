//! Fixtures shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use quorum_types::{Entity, EntityId, Model};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheAdapter, InMemoryCache};
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::registry::{ModelDescriptor, Registry};
use crate::store::DataStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: u64,
    pub name: String,
}

impl Model for Widget {
    const COLLECTION: &'static str = "demo/widget";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

/// Not part of [`TABLE`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub id: u64,
    pub label: String,
}

impl Model for Gadget {
    const COLLECTION: &'static str = "demo/gadget";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

pub static TABLE: &[ModelDescriptor] = &[ModelDescriptor::of::<Widget>()];

pub fn widget(id: u64, name: &str) -> Arc<dyn Entity> {
    Arc::new(Widget {
        id,
        name: name.to_string(),
    })
}

pub fn store_with(cache: Arc<dyn CacheAdapter>) -> DataStore {
    DataStore::new(
        Arc::new(Registry::with_models(TABLE)),
        cache,
        StoreConfig::default(),
    )
}

/// In-memory cache that counts snapshot writes.
#[derive(Default)]
pub struct CountingCache {
    inner: InMemoryCache,
    snapshot_writes: AtomicUsize,
}

impl CountingCache {
    pub fn snapshot_writes(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheAdapter for CountingCache {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        if key == StoreConfig::default().snapshot_key() {
            self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key).await
    }
}
