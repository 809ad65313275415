//! Key-value persistence behind the store snapshot.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Persistent key-value cache used by the [`DataStore`](crate::DataStore).
///
/// Values are JSON documents. A missing key is `Ok(None)`, never an error;
/// errors are reserved for backend failures and propagate to the caller.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// `HashMap`-backed cache for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheAdapter for InMemoryCache {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().expect("lock poisoned").remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("keys", &self.len())
            .finish()
    }
}

/// Directory-backed cache: one pretty-printed JSON file per key.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves either the old or the new value on disk.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open (or create) a cache directory.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::CachePath {
                path: root.clone(),
                source,
            })?;
        debug!(path = %root.display(), "opened file cache");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `key`. Path separators and `:` are not allowed in names.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                ':' | '/' | '\\' => '_',
                other => other,
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl CacheAdapter for FileCache {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, bytes = bytes.len(), "wrote cache entry");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
