use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use quorum_store::{ChangeEvent, DataStore, Emitter, ListenerId};
use quorum_types::{downcast, CollectionId, DeletedRecord, EntityId, Model};
use tracing::{debug, warn};

use crate::latest::{Latest, LatestReceiver};
use crate::view_model::{ModelOf, ViewModel};

/// How a store change relates to a repository.
enum Relevance<M> {
    /// An entity of the owned collection.
    Owned(Arc<M>),
    /// An entity of a declared dependency collection.
    Dependency,
    Unrelated,
}

struct RepoState<V> {
    view_models: BTreeMap<EntityId, Arc<V>>,
    /// Per-id streams, created on first subscription.
    subjects: HashMap<EntityId, Latest<Option<Arc<V>>>>,
}

struct RepoInner<V: ViewModel> {
    store: Arc<DataStore>,
    collection: CollectionId,
    dependencies: Vec<CollectionId>,
    name: &'static str,
    state: RwLock<RepoState<V>>,
    list: Latest<Vec<Arc<V>>>,
    general: Emitter<Arc<V>>,
    removed: Emitter<EntityId>,
}

/// Shared machinery of every repository.
///
/// Mirrors the owned collection of the [`DataStore`] as view models and keeps
/// them current from the store's change and deletion streams. Exposes three
/// broadcasts:
///
/// - a replay-one stream per id ([`view_model_stream`](Self::view_model_stream)),
/// - a replay-one stream of the full list ([`list_stream`](Self::list_stream)),
/// - a no-replay stream of every rebuilt or updated view model
///   ([`general`](Self::general)),
/// - a no-replay stream of the ids of removed view models
///   ([`removed`](Self::removed)).
///
/// Per-id streams are dropped once their last receiver is gone.
///
/// The store subscriptions hold only a weak reference and are removed when
/// the repository is dropped.
pub struct BaseRepository<V: ViewModel> {
    inner: Arc<RepoInner<V>>,
    listeners: Listeners,
}

struct Listeners {
    changed: ListenerId,
    deleted: ListenerId,
    cleared: ListenerId,
}

impl<V: ViewModel> BaseRepository<V> {
    /// Build view models for everything already stored and subscribe to the
    /// store. `dependencies` lists the collections whose changes are passed
    /// to [`ViewModel::update_values`].
    pub fn new(store: Arc<DataStore>, dependencies: Vec<CollectionId>) -> Self {
        let collection = <V::Model as Model>::collection_id();
        let name = type_name::<ModelOf<V>>();

        let view_models: BTreeMap<EntityId, Arc<V>> = store
            .get_all(collection.as_str())
            .into_iter()
            .filter_map(downcast::<ModelOf<V>>)
            .map(|model| {
                let vm = V::build(model, &store);
                (vm.id(), Arc::new(vm))
            })
            .collect();
        let initial: Vec<Arc<V>> = view_models.values().cloned().collect();
        debug!(repository = name, count = initial.len(), "repository set up");

        let inner = Arc::new(RepoInner {
            store: Arc::clone(&store),
            collection,
            dependencies,
            name,
            state: RwLock::new(RepoState {
                view_models,
                subjects: HashMap::new(),
            }),
            list: Latest::new(initial),
            general: Emitter::new(),
            removed: Emitter::new(),
        });

        let weak: Weak<RepoInner<V>> = Arc::downgrade(&inner);
        let changed = store.changes().subscribe({
            let weak = weak.clone();
            move |event: &ChangeEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_change(event);
                }
            }
        });
        let deleted = store.deletions().subscribe({
            let weak = weak.clone();
            move |record: &DeletedRecord| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_delete(record);
                }
            }
        });
        let cleared = store.clears().subscribe(move |_: &()| {
            if let Some(inner) = weak.upgrade() {
                inner.on_clear();
            }
        });

        Self {
            inner,
            listeners: Listeners {
                changed,
                deleted,
                cleared,
            },
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Collection of the owned model.
    pub fn collection(&self) -> &CollectionId {
        &self.inner.collection
    }

    /// Type name of the owned model, for logs.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn get_view_model(&self, id: impl Into<EntityId>) -> Option<Arc<V>> {
        let id = id.into();
        self.inner.read().view_models.get(&id).cloned()
    }

    /// Snapshot of every view model, ordered by id.
    pub fn get_view_model_list(&self) -> Vec<Arc<V>> {
        self.inner.read().view_models.values().cloned().collect()
    }

    /// Replay-one stream of one view model; `None` while absent.
    pub fn view_model_stream(&self, id: impl Into<EntityId>) -> LatestReceiver<Option<Arc<V>>> {
        let id = id.into();
        let mut state = self.inner.write();
        let current = state.view_models.get(&id).cloned();
        state
            .subjects
            .entry(id)
            .or_insert_with(|| Latest::new(current))
            .subscribe()
    }

    /// Replay-one stream of the whole list.
    pub fn list_stream(&self) -> LatestReceiver<Vec<Arc<V>>> {
        self.inner.list.subscribe()
    }

    /// No-replay stream of every rebuilt or updated view model.
    pub fn general(&self) -> &Emitter<Arc<V>> {
        &self.inner.general
    }

    /// No-replay stream of ids whose view model was deleted or cleared.
    pub fn removed(&self) -> &Emitter<EntityId> {
        &self.inner.removed
    }
}

impl<V: ViewModel> Drop for BaseRepository<V> {
    fn drop(&mut self) {
        let store = &self.inner.store;
        store.changes().unsubscribe(self.listeners.changed);
        store.deletions().unsubscribe(self.listeners.deleted);
        store.clears().unsubscribe(self.listeners.cleared);
    }
}

impl<V: ViewModel> fmt::Debug for BaseRepository<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRepository")
            .field("model", &self.inner.name)
            .field("view_models", &self.inner.read().view_models.len())
            .finish()
    }
}

impl<V: ViewModel> RepoInner<V> {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, RepoState<V>> {
        self.state.read().expect("repository lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RepoState<V>> {
        self.state.write().expect("repository lock poisoned")
    }

    fn relevance(&self, event: &ChangeEvent) -> Relevance<ModelOf<V>> {
        if event.collection == self.collection {
            match event.downcast::<ModelOf<V>>() {
                Some(model) => Relevance::Owned(model),
                None => {
                    warn!(repository = self.name, collection = %event.collection, "entity of unexpected type in owned collection");
                    Relevance::Unrelated
                }
            }
        } else if self.dependencies.contains(&event.collection) {
            Relevance::Dependency
        } else {
            Relevance::Unrelated
        }
    }

    fn on_change(&self, event: &ChangeEvent) {
        match self.relevance(event) {
            Relevance::Owned(model) => {
                let vm = Arc::new(V::build(model, &self.store));
                let id = vm.id();
                self.write().view_models.insert(id.clone(), Arc::clone(&vm));
                debug!(repository = self.name, id = %id, "view model rebuilt");
                self.publish_one(&id);
                self.publish_list();
                self.general.emit(&vm);
            }
            Relevance::Dependency => {
                let updated: Vec<Arc<V>> = {
                    let mut state = self.write();
                    state
                        .view_models
                        .values_mut()
                        .filter(|vm| vm.depends_on(event))
                        .map(|vm| {
                            Arc::make_mut(vm).update_values(event);
                            Arc::clone(vm)
                        })
                        .collect()
                };
                debug!(
                    repository = self.name,
                    dependency = %event.collection,
                    count = updated.len(),
                    "view models updated from dependency"
                );
                if updated.is_empty() {
                    return;
                }
                for vm in &updated {
                    self.publish_one(&vm.id());
                }
                self.publish_list();
                for vm in &updated {
                    self.general.emit(vm);
                }
            }
            Relevance::Unrelated => {}
        }
    }

    fn on_delete(&self, record: &DeletedRecord) {
        if record.collection != self.collection {
            return;
        }
        let removed = self.write().view_models.remove(&record.id).is_some();
        debug!(repository = self.name, id = %record.id, removed, "view model deleted");
        self.publish_one(&record.id);
        self.publish_list();
        if removed {
            self.removed.emit(&record.id);
        }
    }

    fn on_clear(&self) {
        let ids: Vec<EntityId> = std::mem::take(&mut self.write().view_models)
            .into_keys()
            .collect();
        self.publish_all();
        self.publish_list();
        for id in &ids {
            self.removed.emit(id);
        }
    }

    /// Publish the current value of `id`, dropping its stream if nobody listens.
    fn publish_one(&self, id: &EntityId) {
        let mut state = self.write();
        let current = state.view_models.get(id).cloned();
        let Some(subject) = state.subjects.get(id) else {
            return;
        };
        subject.publish(current);
        if subject.subscriber_count() == 0 {
            state.subjects.remove(id);
        }
    }

    fn publish_all(&self) {
        let mut state = self.write();
        let RepoState {
            view_models,
            subjects,
        } = &mut *state;
        subjects.retain(|id, subject| {
            subject.publish(view_models.get(id).cloned());
            subject.subscriber_count() > 0
        });
    }

    fn publish_list(&self) {
        let list: Vec<Arc<V>> = self.read().view_models.values().cloned().collect();
        self.list.publish(list);
    }
}
