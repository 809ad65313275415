//! # Quorum SDK
//!
//! Entry point for applications: a [`Session`] wires the registry, the
//! cache, the [`DataStore`](quorum_store::DataStore), the autoupdate path and
//! every repository together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use quorum_sdk::{AlwaysConfirm, Repository, Session, SessionConfig};
//!
//! # async fn run() -> quorum_sdk::SdkResult<()> {
//! let config = SessionConfig::default().with_cache_dir("/tmp/quorum");
//! let session = Session::open(config, None, Arc::new(AlwaysConfirm)).await?;
//! println!("{} motions", session.motions().base().get_view_model_list().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{SdkError, SdkResult};
pub use session::{Session, SessionStatus};

pub use quorum_models as models;
pub use quorum_repo::{
    AlwaysConfirm, DataSend, NeverConfirm, Prompt, RepoError, Repository, ViewModel,
};
pub use quorum_store::{AutoupdateFormat, AutoupdateOutcome, StoreConfig, StoreError};
pub use quorum_types::{ChangeId, CollectionId, Entity, EntityId, Model};
