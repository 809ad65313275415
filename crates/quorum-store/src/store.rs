use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

use quorum_types::{downcast, ChangeId, CollectionId, DeletedRecord, Entity, EntityId, Model};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::CacheAdapter;
use crate::config::StoreConfig;
use crate::emitter::Emitter;
use crate::error::{StoreError, StoreResult};
use crate::registry::Registry;

/// One added or updated entity, as broadcast on [`DataStore::changes`].
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub collection: CollectionId,
    pub id: EntityId,
    pub entity: Arc<dyn Entity>,
}

impl ChangeEvent {
    /// Returns `true` if the changed entity is an `M`.
    pub fn is<M: Model>(&self) -> bool {
        self.entity.as_any().is::<M>()
    }

    /// The changed entity as an `M`, if it is one.
    pub fn downcast<M: Model>(&self) -> Option<Arc<M>> {
        downcast(Arc::clone(&self.entity))
    }
}

/// A live entity together with the id it was stored under.
struct Live {
    id: EntityId,
    entity: Arc<dyn Entity>,
}

/// Both maps are keyed by the string form of the id, so `1` and `"1"` name
/// the same entry in each of them.
type LiveMap = HashMap<CollectionId, HashMap<String, Live>>;
type JsonMap = BTreeMap<CollectionId, BTreeMap<String, Value>>;

/// Live and serialized maps, always updated together under one lock.
#[derive(Default)]
struct StoreState {
    models: LiveMap,
    json: JsonMap,
    max_change_id: ChangeId,
}

impl StoreState {
    fn insert(&mut self, collection: &CollectionId, id: &EntityId, entity: Arc<dyn Entity>, payload: Value) {
        let key = id.to_string();
        self.models.entry(collection.clone()).or_default().insert(
            key.clone(),
            Live {
                id: id.clone(),
                entity,
            },
        );
        self.json
            .entry(collection.clone())
            .or_default()
            .insert(key, payload);
    }

    fn delete(&mut self, collection: &CollectionId, id: &EntityId) -> bool {
        let name = collection.as_str();
        let key = id.to_string();
        let removed = self
            .models
            .get_mut(name)
            .is_some_and(|live| live.remove(&key).is_some());
        if self.models.get(name).is_some_and(HashMap::is_empty) {
            self.models.remove(name);
        }
        if let Some(serialized) = self.json.get_mut(name) {
            serialized.remove(&key);
        }
        if self.json.get(name).is_some_and(BTreeMap::is_empty) {
            self.json.remove(name);
        }
        removed
    }

    fn get(&self, collection: &str, id: &EntityId) -> Option<&Arc<dyn Entity>> {
        self.models
            .get(collection)?
            .get(&id.to_string())
            .map(|live| &live.entity)
    }

    fn advance(&mut self, change_id: Option<ChangeId>) {
        if let Some(change_id) = change_id {
            if change_id > self.max_change_id {
                self.max_change_id = change_id;
            }
        }
    }
}

/// Entity validated and serialized ahead of insertion.
struct Prepared {
    collection: CollectionId,
    id: EntityId,
    entity: Arc<dyn Entity>,
    payload: Value,
}

/// Result of decoding a cached snapshot.
struct Restored {
    state: StoreState,
    events: Vec<ChangeEvent>,
}

/// In-memory, collection-indexed object store.
///
/// Keeps every entity twice: as a live `Arc<dyn Entity>` for readers and as
/// its JSON form for the persistent cache. Both maps change together inside
/// one critical section. Mutations broadcast per-entity change and deletion
/// events through no-replay [`Emitter`]s, then persist the serialized map
/// with exactly one flush per call.
///
/// Listeners run synchronously on the mutating task with no store lock held,
/// so they may read the store (but must not block on a mutation).
///
/// Application code builds exactly one `DataStore` and shares it by `Arc`.
pub struct DataStore {
    registry: Arc<Registry>,
    cache: Arc<dyn CacheAdapter>,
    config: StoreConfig,
    state: RwLock<StoreState>,
    /// Serializes snapshot writes so they reach the cache in order.
    flush_lock: Mutex<()>,
    changed: Emitter<ChangeEvent>,
    deleted: Emitter<DeletedRecord>,
    cleared: Emitter<()>,
}

impl DataStore {
    pub fn new(registry: Arc<Registry>, cache: Arc<dyn CacheAdapter>, config: StoreConfig) -> Self {
        Self {
            registry,
            cache,
            config,
            state: RwLock::new(StoreState::default()),
            flush_lock: Mutex::new(()),
            changed: Emitter::new(),
            deleted: Emitter::new(),
            cleared: Emitter::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stream of added or updated entities.
    pub fn changes(&self) -> &Emitter<ChangeEvent> {
        &self.changed
    }

    /// Stream of deletion records.
    pub fn deletions(&self) -> &Emitter<DeletedRecord> {
        &self.deleted
    }

    /// Fires once after every completed [`clear`](Self::clear).
    pub fn clears(&self) -> &Emitter<()> {
        &self.cleared
    }

    /// Highest change id seen so far.
    pub fn max_change_id(&self) -> ChangeId {
        self.state.read().expect("store lock poisoned").max_change_id
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, collection: &str, id: impl Into<EntityId>) -> Option<Arc<dyn Entity>> {
        let id = id.into();
        self.state
            .read()
            .expect("store lock poisoned")
            .get(collection, &id)
            .cloned()
    }

    /// Entities found for `ids`. Misses are dropped silently.
    pub fn get_many(&self, collection: &str, ids: &[EntityId]) -> Vec<Arc<dyn Entity>> {
        let state = self.state.read().expect("store lock poisoned");
        ids.iter()
            .filter_map(|id| state.get(collection, id).cloned())
            .collect()
    }

    /// Every entity of a collection, ordered by id. Empty for unknown collections.
    pub fn get_all(&self, collection: &str) -> Vec<Arc<dyn Entity>> {
        let state = self.state.read().expect("store lock poisoned");
        let Some(live) = state.models.get(collection) else {
            return Vec::new();
        };
        let mut all: Vec<&Live> = live.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all.into_iter().map(|l| Arc::clone(&l.entity)).collect()
    }

    pub fn filter<P>(&self, collection: &str, predicate: P) -> Vec<Arc<dyn Entity>>
    where
        P: Fn(&Arc<dyn Entity>) -> bool,
    {
        self.get_all(collection)
            .into_iter()
            .filter(|e| predicate(e))
            .collect()
    }

    /// First entity (in id order) matching `predicate`.
    pub fn find<P>(&self, collection: &str, predicate: P) -> Option<Arc<dyn Entity>>
    where
        P: Fn(&Arc<dyn Entity>) -> bool,
    {
        self.get_all(collection).into_iter().find(|e| predicate(e))
    }

    pub fn get_typed<M: Model>(&self, id: impl Into<EntityId>) -> Option<Arc<M>> {
        let collection = self.registry.collection_of::<M>()?;
        self.get(collection.as_str(), id).and_then(downcast::<M>)
    }

    pub fn get_many_typed<M: Model>(&self, ids: &[EntityId]) -> Vec<Arc<M>> {
        match self.registry.collection_of::<M>() {
            Some(c) => self
                .get_many(c.as_str(), ids)
                .into_iter()
                .filter_map(downcast::<M>)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn get_all_typed<M: Model>(&self) -> Vec<Arc<M>> {
        match self.registry.collection_of::<M>() {
            Some(c) => self
                .get_all(c.as_str())
                .into_iter()
                .filter_map(downcast::<M>)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn filter_typed<M: Model>(&self, predicate: impl Fn(&M) -> bool) -> Vec<Arc<M>> {
        self.get_all_typed::<M>()
            .into_iter()
            .filter(|m| predicate(m))
            .collect()
    }

    pub fn find_typed<M: Model>(&self, predicate: impl Fn(&M) -> bool) -> Option<Arc<M>> {
        self.get_all_typed::<M>().into_iter().find(|m| predicate(m))
    }

    /// Collections currently holding at least one entity, sorted.
    pub fn collections(&self) -> Vec<CollectionId> {
        let state = self.state.read().expect("store lock poisoned");
        state.json.keys().cloned().collect()
    }

    /// Entity count per non-empty collection.
    pub fn counts(&self) -> BTreeMap<CollectionId, usize> {
        let state = self.state.read().expect("store lock poisoned");
        state
            .json
            .iter()
            .map(|(c, entries)| (c.clone(), entries.len()))
            .collect()
    }

    /// Total number of stored entities.
    pub fn len(&self) -> usize {
        let state = self.state.read().expect("store lock poisoned");
        state.models.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Insert or replace entities, then persist once.
    ///
    /// Every entity is validated before anything is touched: an entity with
    /// no identity, or one of the abstract sentinel collection, rejects the
    /// whole call. Change events fire in argument order.
    pub async fn add(
        &self,
        entities: Vec<Arc<dyn Entity>>,
        change_id: Option<ChangeId>,
    ) -> StoreResult<()> {
        let prepared = prepare(entities)?;
        let count = prepared.len();
        for item in prepared {
            self.insert_one(item);
        }
        debug!(count, ?change_id, "add complete");
        self.flush(change_id).await
    }

    /// Typed convenience over [`add`](Self::add).
    pub async fn add_models<M: Model>(
        &self,
        models: Vec<M>,
        change_id: Option<ChangeId>,
    ) -> StoreResult<()> {
        let entities = models
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn Entity>)
            .collect();
        self.add(entities, change_id).await
    }

    /// Remove ids of one collection, then persist once.
    ///
    /// Missing ids are not an error; a deletion record is emitted for every id.
    pub async fn remove(
        &self,
        collection: impl Into<CollectionId>,
        ids: &[EntityId],
        change_id: Option<ChangeId>,
    ) -> StoreResult<()> {
        let collection = collection.into();
        for id in ids {
            self.delete_one(&collection, id);
        }
        self.flush(change_id).await
    }

    /// Apply deletions and additions as one change, then persist once.
    ///
    /// The additions are validated before anything is removed, so an invalid
    /// entity rejects the whole call and leaves the store untouched.
    /// Deletions are applied first.
    pub async fn apply_changes(
        &self,
        deleted: &[(CollectionId, Vec<EntityId>)],
        entities: Vec<Arc<dyn Entity>>,
        change_id: Option<ChangeId>,
    ) -> StoreResult<()> {
        let prepared = prepare(entities)?;
        for (collection, ids) in deleted {
            for id in ids {
                self.delete_one(collection, id);
            }
        }
        let count = prepared.len();
        for item in prepared {
            self.insert_one(item);
        }
        debug!(count, ?change_id, "changes applied");
        self.flush(change_id).await
    }

    /// Replace the entire contents of the store.
    ///
    /// Every previously stored entity is reported deleted, then the new
    /// entities are inserted as by [`add`](Self::add).
    pub async fn set(
        &self,
        entities: Vec<Arc<dyn Entity>>,
        change_id: Option<ChangeId>,
    ) -> StoreResult<()> {
        let prepared = prepare(entities)?;
        let previous: Vec<DeletedRecord> = {
            let mut state = self.state.write().expect("store lock poisoned");
            let previous = state
                .models
                .iter()
                .flat_map(|(c, live)| {
                    live.values()
                        .map(move |l| DeletedRecord::new(c.clone(), l.id.clone()))
                })
                .collect();
            state.models.clear();
            state.json.clear();
            previous
        };
        for record in &previous {
            self.deleted.emit(record);
        }
        for item in prepared {
            self.insert_one(item);
        }
        info!(removed = previous.len(), stored = self.len(), "replaced store contents");
        self.flush(change_id).await
    }

    /// Persist the serialized map and the change counter.
    ///
    /// The counter advances only if `change_id` is strictly larger.
    pub async fn flush(&self, change_id: Option<ChangeId>) -> StoreResult<()> {
        let _guard = self.flush_lock.lock().await;
        let (snapshot, max_change_id) = {
            let mut state = self.state.write().expect("store lock poisoned");
            state.advance(change_id);
            (serde_json::to_value(&state.json)?, state.max_change_id)
        };
        self.cache.set(&self.config.snapshot_key(), snapshot).await?;
        self.cache
            .set(&self.config.change_id_key(), Value::from(max_change_id))
            .await?;
        debug!(max_change_id, "flushed store to cache");
        Ok(())
    }

    /// Restore the store from the persistent cache.
    ///
    /// Returns the persisted change counter, or 0 when no usable snapshot
    /// exists (the caller must then reload everything). Collections without
    /// a registered type are skipped. A snapshot that fails to decode is
    /// discarded like a missing one. Cache backend errors propagate.
    pub async fn init_from_cache(&self) -> StoreResult<ChangeId> {
        let Some(snapshot) = self.cache.get(&self.config.snapshot_key()).await? else {
            info!("no cached store, starting empty");
            self.clear().await?;
            return Ok(0);
        };

        let restored = match self.decode_snapshot(snapshot) {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "cached store unreadable, discarding");
                self.clear().await?;
                return Ok(0);
            }
        };

        let max_change_id = self
            .cache
            .get(&self.config.change_id_key())
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let Restored { mut state, events } = restored;
        state.max_change_id = max_change_id;
        *self.state.write().expect("store lock poisoned") = state;

        for event in &events {
            self.changed.emit(event);
        }
        info!(entities = events.len(), max_change_id, "restored store from cache");
        Ok(max_change_id)
    }

    /// Empty both maps, reset the counter and delete the persisted snapshot.
    pub async fn clear(&self) -> StoreResult<()> {
        let _guard = self.flush_lock.lock().await;
        *self.state.write().expect("store lock poisoned") = StoreState::default();
        self.cache.remove(&self.config.snapshot_key()).await?;
        self.cache.remove(&self.config.change_id_key()).await?;
        info!("cleared store");
        self.cleared.emit(&());
        Ok(())
    }

    /// Store one validated entity and announce it.
    fn insert_one(&self, item: Prepared) {
        self.state.write().expect("store lock poisoned").insert(
            &item.collection,
            &item.id,
            Arc::clone(&item.entity),
            item.payload,
        );
        debug!(collection = %item.collection, id = %item.id, "stored entity");
        self.changed.emit(&ChangeEvent {
            collection: item.collection,
            id: item.id,
            entity: item.entity,
        });
    }

    /// Drop one id and announce it, whether or not it was stored.
    fn delete_one(&self, collection: &CollectionId, id: &EntityId) {
        let existed = self
            .state
            .write()
            .expect("store lock poisoned")
            .delete(collection, id);
        debug!(collection = %collection, id = %id, existed, "removed entity");
        self.deleted
            .emit(&DeletedRecord::new(collection.clone(), id.clone()));
    }

    fn decode_snapshot(&self, snapshot: Value) -> StoreResult<Restored> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_value(snapshot)?;
        let mut state = StoreState::default();
        let mut events = Vec::new();

        for (collection, entries) in raw {
            let Some(descriptor) = self.registry.resolve(&collection) else {
                debug!(collection = %collection, entries = entries.len(), "skipping unregistered collection");
                continue;
            };
            let collection = descriptor.collection().clone();
            for (key, payload) in entries {
                let entity = descriptor.decode(payload.clone())?;
                let id = entity
                    .id()
                    .unwrap_or_else(|| EntityId::parse_key(&key));
                state.insert(&collection, &id, Arc::clone(&entity), payload);
                events.push(ChangeEvent {
                    collection: collection.clone(),
                    id,
                    entity,
                });
            }
        }
        Ok(Restored { state, events })
    }
}

/// Validate and serialize a batch. Fails on the first invalid entity.
fn prepare(entities: Vec<Arc<dyn Entity>>) -> StoreResult<Vec<Prepared>> {
    entities
        .into_iter()
        .map(|entity| {
            let collection = entity.collection();
            if collection.is_invalid() {
                error!("refusing to store an abstract base entity");
                return Err(StoreError::AbstractEntity);
            }
            let id = match entity.id() {
                Some(id) if id.is_assigned() => id,
                _ => {
                    error!(collection = %collection, "refusing to store an entity without id");
                    return Err(StoreError::MissingId { collection });
                }
            };
            let payload = entity.to_json()?;
            Ok(Prepared {
                collection,
                id,
                entity,
                payload,
            })
        })
        .collect()
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("counts", &self.counts())
            .field("max_change_id", &self.max_change_id())
            .finish()
    }
}
