//! Application of server autoupdates to the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use quorum_types::{ChangeId, CollectionId, Entity, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::store::DataStore;

/// One autoupdate message as sent by the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoupdateFormat {
    /// Changed or created entities, grouped by collection.
    pub changed: BTreeMap<String, Vec<Value>>,
    /// Deleted ids, grouped by collection.
    pub deleted: BTreeMap<String, Vec<EntityId>>,
    pub from_change_id: ChangeId,
    pub to_change_id: ChangeId,
    /// When set, `changed` is the complete data set and replaces the store.
    pub all_data: bool,
}

/// What [`Autoupdater::apply`] did with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoupdateOutcome {
    /// The delta was applied on top of the local state.
    Applied,
    /// The store was replaced by a full data set.
    Replaced,
    /// The message lies entirely behind the local change id.
    Ignored,
    /// The message starts after the local change id. The caller has to
    /// request a full update.
    Gap { local: ChangeId, from: ChangeId },
}

/// Feeds autoupdates into a [`DataStore`], one at a time.
pub struct Autoupdater {
    store: Arc<DataStore>,
    lock: Mutex<()>,
}

impl Autoupdater {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Apply one message. Concurrent calls are serialized.
    ///
    /// A message is applied whole or not at all, with one cache write.
    pub async fn apply(&self, update: AutoupdateFormat) -> StoreResult<AutoupdateOutcome> {
        let _guard = self.lock.lock().await;

        if update.all_data {
            let entities = self.decode_changed(update.changed)?;
            self.store.set(entities, Some(update.to_change_id)).await?;
            info!(to = update.to_change_id, "applied full data set");
            return Ok(AutoupdateOutcome::Replaced);
        }

        let local = self.store.max_change_id();
        if update.from_change_id <= local && update.to_change_id <= local {
            debug!(local, from = update.from_change_id, to = update.to_change_id, "ignoring stale autoupdate");
            return Ok(AutoupdateOutcome::Ignored);
        }
        if update.from_change_id > local.saturating_add(1) || update.to_change_id <= local {
            warn!(local, from = update.from_change_id, to = update.to_change_id, "autoupdate gap, full update required");
            return Ok(AutoupdateOutcome::Gap {
                local,
                from: update.from_change_id,
            });
        }

        let entities = self.decode_changed(update.changed)?;
        let deleted: Vec<(CollectionId, Vec<EntityId>)> = update
            .deleted
            .into_iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(collection, ids)| (CollectionId::new(collection), ids))
            .collect();
        self.store
            .apply_changes(&deleted, entities, Some(update.to_change_id))
            .await?;
        debug!(from = update.from_change_id, to = update.to_change_id, "applied autoupdate");
        Ok(AutoupdateOutcome::Applied)
    }

    /// Decode every changed payload. Unregistered collections are skipped.
    fn decode_changed(
        &self,
        changed: BTreeMap<String, Vec<Value>>,
    ) -> StoreResult<Vec<Arc<dyn Entity>>> {
        let registry = self.store.registry();
        let mut entities = Vec::new();
        for (collection, payloads) in changed {
            let Some(descriptor) = registry.resolve(&collection) else {
                warn!(collection = %collection, count = payloads.len(), "unregistered collection in autoupdate, ignoring");
                continue;
            };
            for payload in payloads {
                entities.push(descriptor.decode(payload)?);
            }
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::testing::{store_with, widget, CountingCache, Widget};
    use serde_json::json;

    fn updater() -> Autoupdater {
        Autoupdater::new(Arc::new(store_with(Arc::new(InMemoryCache::new()))))
    }

    fn delta(from: ChangeId, to: ChangeId, changed: Value, deleted: Value) -> AutoupdateFormat {
        serde_json::from_value(json!({
            "changed": changed,
            "deleted": deleted,
            "from_change_id": from,
            "to_change_id": to,
            "all_data": false,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn full_data_replaces_store() {
        let au = updater();
        au.store().add(vec![widget(9, "old")], Some(2)).await.unwrap();

        let full = AutoupdateFormat {
            changed: BTreeMap::from([(
                "demo/widget".to_string(),
                vec![json!({"id": 1, "name": "A"})],
            )]),
            to_change_id: 5,
            all_data: true,
            ..Default::default()
        };
        assert_eq!(au.apply(full).await.unwrap(), AutoupdateOutcome::Replaced);
        assert!(au.store().get("demo/widget", 9u64).is_none());
        assert_eq!(au.store().get_typed::<Widget>(1u64).unwrap().name, "A");
        assert_eq!(au.store().max_change_id(), 5);
    }

    #[tokio::test]
    async fn contiguous_delta_is_applied() {
        let au = updater();
        au.store().add(vec![widget(1, "a"), widget(2, "b")], Some(3)).await.unwrap();

        let update = delta(
            4,
            6,
            json!({"demo/widget": [{"id": 1, "name": "a2"}]}),
            json!({"demo/widget": [2]}),
        );
        assert_eq!(au.apply(update).await.unwrap(), AutoupdateOutcome::Applied);
        assert_eq!(au.store().get_typed::<Widget>(1u64).unwrap().name, "a2");
        assert!(au.store().get("demo/widget", 2u64).is_none());
        assert_eq!(au.store().max_change_id(), 6);
    }

    #[tokio::test]
    async fn invalid_delta_leaves_store_untouched() {
        let au = updater();
        au.store().add(vec![widget(1, "a"), widget(2, "b")], Some(3)).await.unwrap();

        let update = delta(
            4,
            5,
            json!({"demo/widget": [{"id": 0, "name": "unsaved"}]}),
            json!({"demo/widget": [2]}),
        );
        assert!(au.apply(update).await.is_err());
        assert_eq!(au.store().get_typed::<Widget>(2u64).unwrap().name, "b");
        assert_eq!(au.store().max_change_id(), 3);
    }

    #[tokio::test]
    async fn delta_is_persisted_once() {
        let cache = Arc::new(CountingCache::default());
        let au = Autoupdater::new(Arc::new(store_with(cache.clone())));
        au.store().add(vec![widget(1, "a"), widget(2, "b")], Some(1)).await.unwrap();

        let update = delta(
            2,
            2,
            json!({"demo/widget": [{"id": 3, "name": "c"}]}),
            json!({"demo/widget": [1, 2]}),
        );
        assert_eq!(au.apply(update).await.unwrap(), AutoupdateOutcome::Applied);
        assert_eq!(cache.snapshot_writes(), 2);
        assert_eq!(au.store().len(), 1);
    }

    #[tokio::test]
    async fn stale_delta_is_ignored() {
        let au = updater();
        au.store().add(vec![widget(1, "a")], Some(10)).await.unwrap();
        let update = delta(7, 9, json!({"demo/widget": [{"id": 1, "name": "z"}]}), json!({}));
        assert_eq!(au.apply(update).await.unwrap(), AutoupdateOutcome::Ignored);
        assert_eq!(au.store().get_typed::<Widget>(1u64).unwrap().name, "a");
    }

    #[tokio::test]
    async fn future_delta_reports_gap() {
        let au = updater();
        au.store().add(vec![widget(1, "a")], Some(3)).await.unwrap();
        let update = delta(8, 9, json!({}), json!({}));
        assert_eq!(
            au.apply(update).await.unwrap(),
            AutoupdateOutcome::Gap { local: 3, from: 8 }
        );
        assert_eq!(au.store().max_change_id(), 3);
    }

    #[tokio::test]
    async fn unregistered_collections_are_skipped() {
        let au = updater();
        let update = delta(
            1,
            1,
            json!({"legacy/thing": [{"id": 1}], "demo/widget": [{"id": 4, "name": "d"}]}),
            json!({}),
        );
        assert_eq!(au.apply(update).await.unwrap(), AutoupdateOutcome::Applied);
        assert_eq!(au.store().len(), 1);
        assert_eq!(au.store().max_change_id(), 1);
    }
}
