//! The seam between repositories and the server.

use std::sync::Arc;

use async_trait::async_trait;
use quorum_store::DataStore;
use quorum_types::{CollectionId, EntityId};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{RepoError, RepoResult};

/// Sends create, update and delete requests for a collection.
///
/// Implementations address resources by [`CollectionId::resource_path`] plus
/// the id. The store is never written here directly: the server's answer
/// arrives later as an autoupdate.
#[async_trait]
pub trait DataSend: Send + Sync {
    /// Create an entity and return the id the server assigned.
    async fn create(&self, collection: &CollectionId, payload: Value) -> RepoResult<EntityId>;

    /// Replace an existing entity.
    async fn update(&self, collection: &CollectionId, id: &EntityId, payload: Value) -> RepoResult<()>;

    async fn delete(&self, collection: &CollectionId, id: &EntityId) -> RepoResult<()>;
}

/// In-process stand-in for the server.
///
/// Assigns numeric ids, bumps the change id for every request and feeds the
/// result back through [`DataStore::add`] and [`DataStore::remove`], the same
/// path a real autoupdate takes.
pub struct LocalBackend {
    store: Arc<DataStore>,
    /// Serializes requests so id and change id assignment cannot race.
    lock: Mutex<()>,
}

impl LocalBackend {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    fn next_id(&self, collection: &CollectionId) -> u64 {
        self.store
            .get_all(collection.as_str())
            .iter()
            .filter_map(|e| e.id().and_then(|id| id.as_int()))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn next_change_id(&self) -> u64 {
        self.store.max_change_id() + 1
    }

    async fn store_payload(&self, collection: &CollectionId, payload: Value) -> RepoResult<()> {
        let entity = self
            .store
            .registry()
            .decode(collection.as_str(), payload)
            .ok_or_else(|| RepoError::Transport(format!("unknown collection {collection}")))??;
        self.store.add(vec![entity], Some(self.next_change_id())).await?;
        Ok(())
    }

    fn ensure_exists(&self, collection: &CollectionId, id: &EntityId) -> RepoResult<()> {
        match self.store.get(collection.as_str(), id.clone()) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound {
                collection: collection.clone(),
                id: id.clone(),
            }),
        }
    }
}

#[async_trait]
impl DataSend for LocalBackend {
    async fn create(&self, collection: &CollectionId, mut payload: Value) -> RepoResult<EntityId> {
        let _guard = self.lock.lock().await;
        let id = self.next_id(collection);
        let Value::Object(fields) = &mut payload else {
            return Err(RepoError::Transport("payload must be an object".into()));
        };
        fields.insert("id".into(), Value::from(id));
        debug!(path = %collection.resource_path(), id, "POST");
        self.store_payload(collection, payload).await?;
        Ok(EntityId::Int(id))
    }

    async fn update(&self, collection: &CollectionId, id: &EntityId, mut payload: Value) -> RepoResult<()> {
        let _guard = self.lock.lock().await;
        self.ensure_exists(collection, id)?;
        let Value::Object(fields) = &mut payload else {
            return Err(RepoError::Transport("payload must be an object".into()));
        };
        fields.insert("id".into(), serde_json::to_value(id)?);
        debug!(path = %format!("{}{id}/", collection.resource_path()), "PUT");
        self.store_payload(collection, payload).await
    }

    async fn delete(&self, collection: &CollectionId, id: &EntityId) -> RepoResult<()> {
        let _guard = self.lock.lock().await;
        self.ensure_exists(collection, id)?;
        debug!(path = %format!("{}{id}/", collection.resource_path()), "DELETE");
        self.store
            .remove(collection.clone(), std::slice::from_ref(id), Some(self.next_change_id()))
            .await?;
        Ok(())
    }
}
