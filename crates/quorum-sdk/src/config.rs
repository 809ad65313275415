use std::path::{Path, PathBuf};

use quorum_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

/// Configuration of a [`Session`](crate::Session), usually read from TOML.
///
/// ```toml
/// cache_dir = "/var/cache/quorum"
/// raw_collections = ["plugin/poll"]
///
/// [store]
/// cache_prefix = "DS:"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory of the file-backed cache. In-memory cache when unset.
    pub cache_dir: Option<PathBuf>,
    /// Late-bound collections stored as raw JSON.
    pub raw_collections: Vec<String>,
    pub store: StoreConfig,
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}
