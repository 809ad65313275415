use std::path::PathBuf;

use quorum_types::{CollectionId, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An entity without identity was passed to `add`.
    #[error("cannot store an entity of {collection} without an id")]
    MissingId { collection: CollectionId },

    /// An entity reporting the abstract sentinel collection was passed to `add`.
    #[error("cannot store an abstract base entity")]
    AbstractEntity,

    /// Encoding or decoding of an entity failed.
    #[error("entity error: {0}")]
    Entity(#[from] TypeError),

    /// Serialization or deserialization of a cache value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying cache backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache directory does not exist and could not be created.
    #[error("cache path {} not usable: {source}", .path.display())]
    CachePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
