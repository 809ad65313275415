use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("payload for {collection} has no usable id")]
    MissingId { collection: String },

    #[error("expected a JSON object for {collection}, got {found}")]
    NotAnObject { collection: String, found: String },
}

impl From<serde_json::Error> for TypeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
