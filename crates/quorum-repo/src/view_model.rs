use std::sync::Arc;

use quorum_store::{ChangeEvent, DataStore};
use quorum_types::{EntityId, Model};

/// Repository-owned wrapper around one entity plus resolved references.
///
/// A view model is rebuilt from scratch whenever its own entity changes.
/// Changes of dependency entities are folded in place through
/// [`update_values`](ViewModel::update_values).
pub trait ViewModel: Clone + Send + Sync + 'static {
    /// The wrapped model type.
    type Model: Model;

    /// Build a view model, resolving references from the current store.
    fn build(model: Arc<Self::Model>, store: &DataStore) -> Self;

    fn model(&self) -> &Arc<Self::Model>;

    /// Identity, always that of the wrapped model.
    fn id(&self) -> EntityId {
        self.model().identity().unwrap_or_default()
    }

    /// Human-readable name, used in prompts and listings.
    fn title(&self) -> String;

    /// Whether a changed dependency entity is referenced by this view model.
    ///
    /// Only referencing view models are copied and passed to
    /// [`update_values`](ViewModel::update_values). The default answers
    /// `true` for every change.
    fn depends_on(&self, _change: &ChangeEvent) -> bool {
        true
    }

    /// Fold a changed dependency into this view model.
    fn update_values(&mut self, _change: &ChangeEvent) {}
}

/// Model type behind a view model.
pub type ModelOf<V> = <V as ViewModel>::Model;
