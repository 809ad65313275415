use std::sync::Arc;

use async_trait::async_trait;
use quorum_types::{Entity, EntityId, Model};
use tracing::debug;

use crate::base::BaseRepository;
use crate::error::{RepoError, RepoResult};
use crate::patch::{apply_patch, Patch};
use crate::prompt::Prompt;
use crate::transport::DataSend;
use crate::view_model::{ModelOf, ViewModel};

/// Title of the confirmation shown by [`Repository::delete`].
pub const DELETE_PROMPT_TITLE: &str = "Are you sure you want to delete this entry?";

/// Mutating contract shared by every repository.
///
/// Mutations never write the store: they go through [`DataSend`] and reach
/// the view models when the server's answer is added to the store.
#[async_trait]
pub trait Repository: Send + Sync {
    type View: ViewModel;

    fn base(&self) -> &BaseRepository<Self::View>;

    fn transport(&self) -> &dyn DataSend;

    fn prompt(&self) -> &dyn Prompt;

    /// Send a new model and return the id the server assigned.
    async fn create(&self, model: ModelOf<Self::View>) -> RepoResult<EntityId> {
        let collection = <ModelOf<Self::View> as Model>::collection_id();
        let payload = model.to_json()?;
        let id = self.transport().create(&collection, payload).await?;
        debug!(collection = %collection, id = %id, "created");
        Ok(id)
    }

    /// Merge `patch` over the entity of `view` and send the result.
    ///
    /// Returns the patched model as sent.
    async fn update(
        &self,
        patch: Patch,
        view: &Self::View,
    ) -> RepoResult<Arc<ModelOf<Self::View>>> {
        let collection = <ModelOf<Self::View> as Model>::collection_id();
        let patched = apply_patch(view.model().as_ref(), &patch)?;
        self.transport()
            .update(&collection, &view.id(), patched.to_json()?)
            .await?;
        Ok(Arc::new(patched))
    }

    /// Delete without asking.
    async fn actual_delete(&self, view: &Self::View) -> RepoResult<()> {
        let collection = <ModelOf<Self::View> as Model>::collection_id();
        self.transport().delete(&collection, &view.id()).await
    }

    /// Ask for confirmation, then delete.
    ///
    /// A declined prompt yields [`RepoError::DialogClosed`] and changes nothing.
    async fn delete(&self, view: &Self::View) -> RepoResult<()> {
        if !self
            .prompt()
            .confirm(DELETE_PROMPT_TITLE, &view.title())
            .await
        {
            debug!(id = %view.id(), "delete declined");
            return Err(RepoError::DialogClosed);
        }
        self.actual_delete(view).await
    }
}
