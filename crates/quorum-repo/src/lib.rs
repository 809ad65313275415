//! Repository and view-model layer for Quorum.
//!
//! One repository exists per entity type. It mirrors its collection of the
//! [`DataStore`](quorum_store::DataStore) as [`ViewModel`]s, keeps them current
//! from the store's streams and re-broadcasts them to consumers.
//!
//! Mutations go through the [`DataSend`] transport seam and come back through
//! the store, never around it.

pub mod base;
pub mod error;
pub mod latest;
pub mod patch;
pub mod prompt;
pub mod repository;
pub mod transport;
pub mod view_model;

#[cfg(test)]
pub(crate) mod testing;

pub use base::BaseRepository;
pub use error::{RepoError, RepoResult};
pub use latest::{Latest, LatestReceiver};
pub use patch::{apply_patch, Patch};
pub use prompt::{AlwaysConfirm, NeverConfirm, Prompt};
pub use repository::{Repository, DELETE_PROMPT_TITLE};
pub use transport::{DataSend, LocalBackend};
pub use view_model::{ModelOf, ViewModel};
