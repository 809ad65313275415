//! Configuration variables and their grouped presentation.

use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use quorum_repo::{
    BaseRepository, DataSend, Latest, LatestReceiver, Patch, Prompt, RepoError, RepoResult,
    Repository, ViewModel,
};
use quorum_store::DataStore;
use quorum_types::{EntityId, Model};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One configuration variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub id: u64,
    pub key: String,
    pub value: Value,
}

impl Model for Config {
    const COLLECTION: &'static str = "core/config";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

/// Static description of a configuration variable, delivered by the server
/// separately from the values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantItem {
    pub key: String,
    pub label: String,
    pub help_text: String,
    pub input_type: String,
    pub default_value: Value,
    pub choices: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantSubgroup {
    /// Empty for items that belong directly to the group.
    pub name: String,
    pub items: Vec<ConstantItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantGroup {
    pub name: String,
    pub subgroups: Vec<ConstantSubgroup>,
}

#[derive(Clone, Debug)]
pub struct ViewConfig {
    config: Arc<Config>,
    constants: Option<ConstantItem>,
}

impl ViewConfig {
    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn value(&self) -> &Value {
        &self.config.value
    }

    pub fn constants(&self) -> Option<&ConstantItem> {
        self.constants.as_ref()
    }

    pub fn set_constants_info(&mut self, constants: ConstantItem) {
        self.constants = Some(constants);
    }
}

impl ViewModel for ViewConfig {
    type Model = Config;

    fn build(config: Arc<Config>, _store: &DataStore) -> Self {
        Self {
            config,
            constants: None,
        }
    }

    fn model(&self) -> &Arc<Config> {
        &self.config
    }

    /// The label from the constants, falling back to the key.
    fn title(&self) -> String {
        match &self.constants {
            Some(c) if !c.label.is_empty() => c.label.clone(),
            _ => self.config.key.clone(),
        }
    }
}

/// A configuration variable in the grouped structure.
#[derive(Clone, Debug)]
pub struct ConfigItem {
    pub key: String,
    /// `None` until a value for the key is stored.
    pub config: Option<Arc<ViewConfig>>,
    pub data: ConstantItem,
}

#[derive(Clone, Debug)]
pub struct ConfigSubgroup {
    pub name: String,
    pub items: Vec<ConfigItem>,
}

#[derive(Clone, Debug)]
pub struct ConfigGroup {
    pub name: String,
    pub subgroups: Vec<ConfigSubgroup>,
    pub items: Vec<ConfigItem>,
}

impl ConfigGroup {
    fn items_mut(&mut self) -> impl Iterator<Item = &mut ConfigItem> {
        self.subgroups
            .iter_mut()
            .flat_map(|s| s.items.iter_mut())
            .chain(self.items.iter_mut())
    }
}

/// Build the empty grouped structure from the constants.
pub fn build_structure(constants: &[ConstantGroup]) -> Vec<ConfigGroup> {
    constants
        .iter()
        .map(|group| {
            let mut out = ConfigGroup {
                name: group.name.clone(),
                subgroups: Vec::new(),
                items: Vec::new(),
            };
            for subgroup in &group.subgroups {
                let items = subgroup.items.iter().map(|data| ConfigItem {
                    key: data.key.clone(),
                    config: None,
                    data: data.clone(),
                });
                if subgroup.name.is_empty() {
                    out.items.extend(items);
                } else {
                    out.subgroups.push(ConfigSubgroup {
                        name: subgroup.name.clone(),
                        items: items.collect(),
                    });
                }
            }
            out
        })
        .collect()
}

/// Grouped structure plus its replay-one stream.
struct Structure {
    groups: RwLock<Option<Vec<ConfigGroup>>>,
    stream: Latest<Option<Vec<ConfigGroup>>>,
}

impl Structure {
    /// Place `configs` into the items with matching keys and republish.
    fn update(&self, configs: &[Arc<ViewConfig>]) {
        let snapshot = {
            let mut guard = self.groups.write().expect("config structure lock poisoned");
            let Some(groups) = guard.as_mut() else {
                return;
            };
            for group in groups.iter_mut() {
                for item in group.items_mut() {
                    if let Some(config) = configs.iter().find(|c| c.key() == item.key) {
                        let mut view = ViewConfig::clone(config);
                        view.set_constants_info(item.data.clone());
                        item.config = Some(Arc::new(view));
                    }
                }
            }
            groups.clone()
        };
        self.stream.publish(Some(snapshot));
    }

    /// Detach the variable with `id` from its item and republish.
    fn remove(&self, id: &EntityId) {
        let snapshot = {
            let mut guard = self.groups.write().expect("config structure lock poisoned");
            let Some(groups) = guard.as_mut() else {
                return;
            };
            let mut detached = false;
            for group in groups.iter_mut() {
                for item in group.items_mut() {
                    if item.config.as_ref().is_some_and(|c| &c.id() == id) {
                        item.config = None;
                        detached = true;
                    }
                }
            }
            if !detached {
                return;
            }
            groups.clone()
        };
        self.stream.publish(Some(snapshot));
    }
}

/// Repository of configuration variables.
///
/// Besides the flat view models it maintains the grouped structure described
/// by the constants and publishes it on its own stream. Variables can only be
/// updated; create and delete are rejected.
pub struct ConfigRepository {
    base: BaseRepository<ViewConfig>,
    structure: Arc<Structure>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl ConfigRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        let base = BaseRepository::new(store, Vec::new());
        let structure = Arc::new(Structure {
            groups: RwLock::new(None),
            stream: Latest::new(None),
        });
        let weak: Weak<Structure> = Arc::downgrade(&structure);
        base.general().subscribe({
            let weak = weak.clone();
            move |view: &Arc<ViewConfig>| {
                if let Some(structure) = weak.upgrade() {
                    structure.update(std::slice::from_ref(view));
                }
            }
        });
        base.removed().subscribe(move |id: &EntityId| {
            if let Some(structure) = weak.upgrade() {
                structure.remove(id);
            }
        });
        Self {
            base,
            structure,
            transport,
            prompt,
        }
    }

    /// Install the constants and fill the structure with the current values.
    pub fn set_constants(&self, constants: &[ConstantGroup]) {
        let groups = build_structure(constants);
        debug!(groups = groups.len(), "config structure built");
        *self
            .structure
            .groups
            .write()
            .expect("config structure lock poisoned") = Some(groups);
        self.structure.update(&self.base.get_view_model_list());
    }

    /// Current grouped structure; `None` before constants arrived.
    pub fn structure(&self) -> Option<Vec<ConfigGroup>> {
        self.structure
            .groups
            .read()
            .expect("config structure lock poisoned")
            .clone()
    }

    /// Replay-one stream of the grouped structure.
    pub fn structure_stream(&self) -> LatestReceiver<Option<Vec<ConfigGroup>>> {
        self.structure.stream.subscribe()
    }

    /// View model of a variable by key, with constants info when known.
    pub fn config(&self, key: &str) -> Option<Arc<ViewConfig>> {
        let from_structure = self.structure().and_then(|groups| {
            groups.into_iter().find_map(|mut g| {
                g.items_mut()
                    .find(|i| i.key == key)
                    .and_then(|i| i.config.take())
            })
        });
        from_structure.or_else(|| {
            self.base
                .get_view_model_list()
                .into_iter()
                .find(|c| c.key() == key)
        })
    }

    /// Set the value of a variable.
    pub async fn set_value(&self, key: &str, value: Value) -> RepoResult<Arc<Config>> {
        let view = self.config(key).ok_or_else(|| RepoError::NotFound {
            collection: Config::collection_id(),
            id: EntityId::from(key),
        })?;
        let mut patch = Patch::new();
        patch.insert("value".into(), value);
        self.update(patch, &view).await
    }
}

#[async_trait]
impl Repository for ConfigRepository {
    type View = ViewConfig;

    fn base(&self) -> &BaseRepository<ViewConfig> {
        &self.base
    }

    fn transport(&self) -> &dyn DataSend {
        self.transport.as_ref()
    }

    fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    async fn create(&self, _model: Config) -> RepoResult<EntityId> {
        Err(RepoError::Unsupported("config variables cannot be created"))
    }

    async fn actual_delete(&self, _view: &ViewConfig) -> RepoResult<()> {
        Err(RepoError::Unsupported("config variables cannot be deleted"))
    }

    async fn delete(&self, _view: &ViewConfig) -> RepoResult<()> {
        Err(RepoError::Unsupported("config variables cannot be deleted"))
    }
}
