use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] quorum_store::StoreError),

    #[error("repository error: {0}")]
    Repo(#[from] quorum_repo::RepoError),
}

impl From<toml::de::Error> for SdkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
