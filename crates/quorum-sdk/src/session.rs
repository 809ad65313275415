use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use quorum_models::{
    CategoryRepository, ConfigRepository, MotionRepository, UserRepository, WorkflowRepository,
    MODELS,
};
use quorum_repo::{DataSend, LocalBackend, Prompt};
use quorum_store::{
    AutoupdateFormat, AutoupdateOutcome, Autoupdater, CacheAdapter, DataStore, FileCache,
    InMemoryCache, Registry,
};
use quorum_types::{ChangeId, CollectionId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::SdkResult;

/// Summary of a session's local state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub max_change_id: ChangeId,
    /// Cache directory, `None` for an in-memory session.
    pub cache_dir: Option<PathBuf>,
    /// Entity count per collection.
    pub collections: BTreeMap<String, usize>,
}

/// One client session: the store, its cache and every repository.
///
/// Exactly one [`DataStore`] exists per session. Repositories are created
/// before the cache is read, so entities restored from the cache reach them
/// through the regular change stream.
pub struct Session {
    config: SessionConfig,
    store: Arc<DataStore>,
    autoupdater: Autoupdater,
    transport: Arc<dyn DataSend>,
    restored_change_id: ChangeId,
    categories: CategoryRepository,
    workflows: WorkflowRepository,
    users: UserRepository,
    motions: MotionRepository,
    configs: ConfigRepository,
}

impl Session {
    /// Open a session.
    ///
    /// Without a `transport` mutations are answered by a [`LocalBackend`]
    /// writing straight into the session's store.
    pub async fn open(
        config: SessionConfig,
        transport: Option<Arc<dyn DataSend>>,
        prompt: Arc<dyn Prompt>,
    ) -> SdkResult<Self> {
        let cache: Arc<dyn CacheAdapter> = match &config.cache_dir {
            Some(dir) => Arc::new(FileCache::open(dir).await?),
            None => Arc::new(InMemoryCache::new()),
        };

        let registry = Arc::new(Registry::with_models(MODELS));
        for collection in &config.raw_collections {
            registry.register_raw(CollectionId::new(collection.clone()));
        }

        let store = Arc::new(DataStore::new(registry, cache, config.store.clone()));
        let transport = transport
            .unwrap_or_else(|| Arc::new(LocalBackend::new(Arc::clone(&store))) as Arc<dyn DataSend>);

        let categories =
            CategoryRepository::new(Arc::clone(&store), Arc::clone(&transport), Arc::clone(&prompt));
        let workflows =
            WorkflowRepository::new(Arc::clone(&store), Arc::clone(&transport), Arc::clone(&prompt));
        let users =
            UserRepository::new(Arc::clone(&store), Arc::clone(&transport), Arc::clone(&prompt));
        let motions =
            MotionRepository::new(Arc::clone(&store), Arc::clone(&transport), Arc::clone(&prompt));
        let configs = ConfigRepository::new(Arc::clone(&store), Arc::clone(&transport), prompt);

        let restored_change_id = store.init_from_cache().await?;
        let autoupdater = Autoupdater::new(Arc::clone(&store));

        info!(
            cache = ?config.cache_dir,
            entities = store.len(),
            change_id = restored_change_id,
            "session opened"
        );

        Ok(Self {
            config,
            store,
            autoupdater,
            transport,
            restored_change_id,
            categories,
            workflows,
            users,
            motions,
            configs,
        })
    }

    // ---- Accessors ----

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn DataSend> {
        &self.transport
    }

    pub fn categories(&self) -> &CategoryRepository {
        &self.categories
    }

    pub fn workflows(&self) -> &WorkflowRepository {
        &self.workflows
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn motions(&self) -> &MotionRepository {
        &self.motions
    }

    pub fn configs(&self) -> &ConfigRepository {
        &self.configs
    }

    // ---- State ----

    /// Change id restored from the cache when the session was opened.
    pub fn restored_change_id(&self) -> ChangeId {
        self.restored_change_id
    }

    pub fn max_change_id(&self) -> ChangeId {
        self.store.max_change_id()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            max_change_id: self.store.max_change_id(),
            cache_dir: self.config.cache_dir.clone(),
            collections: self
                .store
                .counts()
                .into_iter()
                .map(|(c, n)| (c.to_string(), n))
                .collect(),
        }
    }

    // ---- Updates ----

    /// Feed one autoupdate message into the store.
    pub async fn apply_autoupdate(&self, update: AutoupdateFormat) -> SdkResult<AutoupdateOutcome> {
        let outcome = self.autoupdater.apply(update).await?;
        debug!(?outcome, change_id = self.store.max_change_id(), "autoupdate processed");
        Ok(outcome)
    }

    /// Drop all local data, in memory and in the cache.
    pub async fn clear(&self) -> SdkResult<()> {
        self.store.clear().await?;
        info!("session data cleared");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cache_dir", &self.config.cache_dir)
            .field("entities", &self.store.len())
            .field("max_change_id", &self.store.max_change_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_models::{Category, ConstantGroup, ConstantItem, ConstantSubgroup, Motion};
    use quorum_repo::{AlwaysConfirm, NeverConfirm, RepoError, Repository};
    use quorum_types::EntityId;
    use serde_json::{json, Value};

    fn full_update(to: ChangeId, changed: Value) -> AutoupdateFormat {
        serde_json::from_value(json!({
            "changed": changed,
            "to_change_id": to,
            "all_data": true,
        }))
        .unwrap()
    }

    fn fixture() -> Value {
        json!({
            "motions/category": [{"id": 1, "name": "Budget", "prefix": "B"}],
            "motions/workflow": [{
                "id": 1,
                "name": "Simple",
                "first_state_id": 10,
                "states": [
                    {"id": 10, "name": "submitted", "next_states_id": [11]},
                    {"id": 11, "name": "accepted"}
                ]
            }],
            "users/user": [{"id": 5, "username": "ada", "first_name": "Ada", "last_name": "Lovelace"}],
            "motions/motion": [{
                "id": 1,
                "identifier": "B1",
                "title": "More coffee",
                "category_id": 1,
                "submitters": [{"user_id": 5, "weight": 1}],
                "workflow_id": 1,
                "state_id": 10
            }],
            "core/config": [{"id": 1, "key": "general_event_name", "value": "Assembly"}]
        })
    }

    async fn memory_session() -> Session {
        Session::open(SessionConfig::default(), None, Arc::new(AlwaysConfirm))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_session_is_empty() {
        let session = memory_session().await;
        assert_eq!(session.restored_change_id(), 0);
        assert_eq!(session.max_change_id(), 0);
        assert!(session.status().collections.is_empty());
        assert!(session.motions().base().get_view_model_list().is_empty());
    }

    #[tokio::test]
    async fn autoupdate_reaches_repositories() {
        let session = memory_session().await;
        let outcome = session.apply_autoupdate(full_update(4, fixture())).await.unwrap();
        assert_eq!(outcome, AutoupdateOutcome::Replaced);

        let motion = session.motions().base().get_view_model(1u64).unwrap();
        assert_eq!(motion.category().map(|c| c.name.as_str()), Some("Budget"));
        assert_eq!(motion.submitters().len(), 1);
        assert_eq!(motion.state().map(|s| s.name.as_str()), Some("submitted"));

        let status = session.status();
        assert_eq!(status.max_change_id, 4);
        assert_eq!(status.collections["motions/motion"], 1);
        assert_eq!(status.collections.len(), 5);
    }

    #[tokio::test]
    async fn cache_restores_into_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::default().with_cache_dir(dir.path());
        {
            let session = Session::open(config.clone(), None, Arc::new(AlwaysConfirm))
                .await
                .unwrap();
            session.apply_autoupdate(full_update(7, fixture())).await.unwrap();
        }

        let session = Session::open(config, None, Arc::new(AlwaysConfirm))
            .await
            .unwrap();
        assert_eq!(session.restored_change_id(), 7);
        let motion = session.motions().base().get_view_model(1u64).unwrap();
        assert_eq!(motion.workflow().map(|w| w.name.as_str()), Some("Simple"));
        assert_eq!(motion.submitters()[0].first_name, "Ada");
        assert_eq!(session.categories().sorted().len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_store_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::default().with_cache_dir(dir.path());
        let session = Session::open(config.clone(), None, Arc::new(AlwaysConfirm))
            .await
            .unwrap();
        session.apply_autoupdate(full_update(3, fixture())).await.unwrap();
        session.clear().await.unwrap();
        assert!(session.store().is_empty());
        assert!(session.motions().base().get_view_model_list().is_empty());
        drop(session);

        let reopened = Session::open(config, None, Arc::new(AlwaysConfirm))
            .await
            .unwrap();
        assert_eq!(reopened.restored_change_id(), 0);
        assert!(reopened.store().is_empty());
    }

    #[tokio::test]
    async fn local_backend_round_trip() {
        let session = memory_session().await;
        session.apply_autoupdate(full_update(1, fixture())).await.unwrap();

        let id = session
            .categories()
            .create(Category {
                name: "Statutes".into(),
                prefix: "S".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(id, EntityId::Int(2));
        assert_eq!(session.categories().sorted().len(), 2);
        assert_eq!(session.max_change_id(), 2);

        let view = session.motions().base().get_view_model(1u64).unwrap();
        session.motions().set_state(&view, 11).await.unwrap();
        let view = session.motions().base().get_view_model(1u64).unwrap();
        assert!(view.is_final_state());

        session.motions().delete(&view).await.unwrap();
        assert!(session.store().get_typed::<Motion>(1u64).is_none());
    }

    #[tokio::test]
    async fn declined_delete_keeps_motion() {
        let session = Session::open(SessionConfig::default(), None, Arc::new(NeverConfirm))
            .await
            .unwrap();
        session.apply_autoupdate(full_update(1, fixture())).await.unwrap();
        let view = session.motions().base().get_view_model(1u64).unwrap();
        let err = session.motions().delete(&view).await.unwrap_err();
        assert!(matches!(err, RepoError::DialogClosed));
        assert!(session.store().get_typed::<Motion>(1u64).is_some());
    }

    #[tokio::test]
    async fn config_structure_follows_values() {
        let session = memory_session().await;
        session.apply_autoupdate(full_update(1, fixture())).await.unwrap();
        session.configs().set_constants(&[ConstantGroup {
            name: "General".into(),
            subgroups: vec![ConstantSubgroup {
                name: "Event".into(),
                items: vec![ConstantItem {
                    key: "general_event_name".into(),
                    label: "Event name".into(),
                    ..Default::default()
                }],
            }],
        }]);

        session
            .configs()
            .set_value("general_event_name", json!("Spring Assembly"))
            .await
            .unwrap();
        let view = session.configs().config("general_event_name").unwrap();
        assert_eq!(view.value(), &json!("Spring Assembly"));
        assert_eq!(view.constants().map(|c| c.label.as_str()), Some("Event name"));
    }

    #[tokio::test]
    async fn raw_collections_are_accepted() {
        let config = SessionConfig {
            raw_collections: vec!["plugin/poll".into()],
            ..Default::default()
        };
        let session = Session::open(config, None, Arc::new(AlwaysConfirm))
            .await
            .unwrap();
        session
            .apply_autoupdate(full_update(2, json!({"plugin/poll": [{"id": 1, "open": true}]})))
            .await
            .unwrap();
        let poll = session.store().get("plugin/poll", 1u64).unwrap();
        assert_eq!(poll.to_json().unwrap(), json!({"id": 1, "open": true}));
    }
}
