use std::sync::Arc;

use quorum_repo::{BaseRepository, DataSend, Prompt, Repository, ViewModel};
use quorum_store::DataStore;
use quorum_types::{EntityId, Model};
use serde::{Deserialize, Serialize};

/// Motion category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub prefix: String,
    pub weight: i32,
    pub parent_id: Option<u64>,
}

impl Model for Category {
    const COLLECTION: &'static str = "motions/category";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

#[derive(Clone, Debug)]
pub struct ViewCategory {
    category: Arc<Category>,
}

impl ViewCategory {
    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn prefix(&self) -> Option<&str> {
        Some(self.category.prefix.as_str()).filter(|p| !p.is_empty())
    }
}

impl ViewModel for ViewCategory {
    type Model = Category;

    fn build(category: Arc<Category>, _store: &DataStore) -> Self {
        Self { category }
    }

    fn model(&self) -> &Arc<Category> {
        &self.category
    }

    /// `"{prefix} - {name}"`, or just the name without prefix.
    fn title(&self) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix} - {}", self.category.name),
            None => self.category.name.clone(),
        }
    }
}

pub struct CategoryRepository {
    base: BaseRepository<ViewCategory>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl CategoryRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            base: BaseRepository::new(store, Vec::new()),
            transport,
            prompt,
        }
    }

    /// Categories ordered by weight, then id.
    pub fn sorted(&self) -> Vec<Arc<ViewCategory>> {
        let mut all = self.base.get_view_model_list();
        all.sort_by_key(|c| (c.category.weight, c.category.id));
        all
    }
}

impl Repository for CategoryRepository {
    type View = ViewCategory;

    fn base(&self) -> &BaseRepository<ViewCategory> {
        &self.base
    }

    fn transport(&self) -> &dyn DataSend {
        self.transport.as_ref()
    }

    fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }
}
