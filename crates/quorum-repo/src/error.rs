use quorum_store::StoreError;
use quorum_types::{CollectionId, EntityId, TypeError};

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The user declined or dismissed a confirmation prompt.
    ///
    /// Not a failure; callers should drop it silently.
    #[error("dialog closed")]
    DialogClosed,

    /// The repository does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("{collection} {id} not found")]
    NotFound { collection: CollectionId, id: EntityId },

    /// The transport layer refused the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A patch could not be applied to the entity.
    #[error("invalid patch: {0}")]
    Patch(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("entity error: {0}")]
    Entity(#[from] TypeError),
}

impl RepoError {
    /// Returns `true` for [`RepoError::DialogClosed`].
    pub fn is_dialog_closed(&self) -> bool {
        matches!(self, Self::DialogClosed)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Entity(err.into())
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
