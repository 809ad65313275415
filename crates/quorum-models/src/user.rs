use std::sync::Arc;

use quorum_repo::{BaseRepository, DataSend, Prompt, Repository, ViewModel};
use quorum_store::DataStore;
use quorum_types::{EntityId, Model};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub structure_level: String,
    pub number: String,
    pub email: String,
    pub is_present: bool,
    pub is_active: bool,
}

impl User {
    /// Title, first and last name; the username if all are empty.
    pub fn short_name(&self) -> String {
        let parts: Vec<&str> = [&self.title, &self.first_name, &self.last_name]
            .into_iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.trim().to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Short name followed by structure level and participant number.
    pub fn full_name(&self) -> String {
        let additions: Vec<&str> = [&self.structure_level, &self.number]
            .into_iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        let name = self.short_name();
        if additions.is_empty() {
            name
        } else {
            format!("{name} ({})", additions.join(" · "))
        }
    }
}

impl Model for User {
    const COLLECTION: &'static str = "users/user";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

#[derive(Clone, Debug)]
pub struct ViewUser {
    user: Arc<User>,
}

impl ViewUser {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn full_name(&self) -> String {
        self.user.full_name()
    }
}

impl ViewModel for ViewUser {
    type Model = User;

    fn build(user: Arc<User>, _store: &DataStore) -> Self {
        Self { user }
    }

    fn model(&self) -> &Arc<User> {
        &self.user
    }

    fn title(&self) -> String {
        self.user.full_name()
    }
}

pub struct UserRepository {
    base: BaseRepository<ViewUser>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl UserRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            base: BaseRepository::new(store, Vec::new()),
            transport,
            prompt,
        }
    }

    /// Users currently marked present.
    pub fn present(&self) -> Vec<Arc<ViewUser>> {
        self.base
            .get_view_model_list()
            .into_iter()
            .filter(|u| u.user.is_present)
            .collect()
    }
}

impl Repository for UserRepository {
    type View = ViewUser;

    fn base(&self) -> &BaseRepository<ViewUser> {
        &self.base
    }

    fn transport(&self) -> &dyn DataSend {
        self.transport.as_ref()
    }

    fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }
}
