//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use quorum_store::{ChangeEvent, DataStore, InMemoryCache, ModelDescriptor, Registry, StoreConfig};
use quorum_types::{CollectionId, Entity, EntityId, Model};
use serde::{Deserialize, Serialize};

use crate::base::BaseRepository;
use crate::prompt::Prompt;
use crate::repository::Repository;
use crate::transport::DataSend;
use crate::view_model::ViewModel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub tag_id: Option<u64>,
}

impl Model for Note {
    const COLLECTION: &'static str = "demo/note";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

impl Model for Tag {
    const COLLECTION: &'static str = "demo/tag";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

static TABLE: &[ModelDescriptor] = &[ModelDescriptor::of::<Note>(), ModelDescriptor::of::<Tag>()];

pub fn store() -> Arc<DataStore> {
    Arc::new(DataStore::new(
        Arc::new(Registry::with_models(TABLE)),
        Arc::new(InMemoryCache::new()),
        StoreConfig::default(),
    ))
}

pub fn note(id: u64, text: &str, tag_id: Option<u64>) -> Arc<dyn Entity> {
    Arc::new(Note {
        id,
        text: text.into(),
        tag_id,
    })
}

pub fn tag(id: u64, name: &str) -> Arc<dyn Entity> {
    Arc::new(Tag {
        id,
        name: name.into(),
    })
}

#[derive(Clone, Debug)]
pub struct NoteView {
    note: Arc<Note>,
    tag: Option<Arc<Tag>>,
}

impl NoteView {
    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_deref().map(|t| t.name.as_str())
    }
}

impl ViewModel for NoteView {
    type Model = Note;

    fn build(note: Arc<Note>, store: &DataStore) -> Self {
        let tag = note.tag_id.and_then(|id| store.get_typed::<Tag>(id));
        Self { note, tag }
    }

    fn model(&self) -> &Arc<Note> {
        &self.note
    }

    fn title(&self) -> String {
        self.note.text.clone()
    }

    fn depends_on(&self, change: &ChangeEvent) -> bool {
        change.is::<Tag>() && self.note.tag_id.is_some_and(|id| change.id == EntityId::Int(id))
    }

    fn update_values(&mut self, change: &ChangeEvent) {
        if let Some(tag) = change.downcast::<Tag>() {
            if self.note.tag_id == Some(tag.id) {
                self.tag = Some(tag);
            }
        }
    }
}

pub struct NoteRepository {
    base: BaseRepository<NoteView>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl NoteRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            base: BaseRepository::new(store, vec![CollectionId::from_static(Tag::COLLECTION)]),
            transport,
            prompt,
        }
    }
}

impl Repository for NoteRepository {
    type View = NoteView;

    fn base(&self) -> &BaseRepository<NoteView> {
        &self.base
    }

    fn transport(&self) -> &dyn DataSend {
        self.transport.as_ref()
    }

    fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }
}
