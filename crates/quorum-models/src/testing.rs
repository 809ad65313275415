//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use quorum_repo::{AlwaysConfirm, DataSend, LocalBackend, Prompt};
use quorum_store::{DataStore, InMemoryCache, Registry, StoreConfig};
use quorum_types::Entity;
use serde_json::Value;

use crate::category::Category;
use crate::config::Config;
use crate::motion::{Motion, Submitter};
use crate::user::User;
use crate::workflow::{Workflow, WorkflowState};
use crate::MODELS;

pub fn store() -> Arc<DataStore> {
    Arc::new(DataStore::new(
        Arc::new(Registry::with_models(MODELS)),
        Arc::new(InMemoryCache::new()),
        StoreConfig::default(),
    ))
}

/// A store with a local backend and a prompt that always confirms.
pub fn session_parts() -> (Arc<DataStore>, Arc<dyn DataSend>, Arc<dyn Prompt>) {
    let store = store();
    let transport = Arc::new(LocalBackend::new(Arc::clone(&store)));
    (store, transport, Arc::new(AlwaysConfirm))
}

pub fn category(id: u64, name: &str, weight: i32) -> Arc<dyn Entity> {
    Arc::new(Category {
        id,
        name: name.into(),
        weight,
        ..Default::default()
    })
}

pub fn user(id: u64, first_name: &str) -> User {
    User {
        id,
        username: first_name.to_lowercase(),
        first_name: first_name.into(),
        ..Default::default()
    }
}

/// Workflow `id` with states `base` (submitted), `base + 1` (accepted) and
/// `base + 2` (rejected).
pub fn simple_workflow(id: u64, base: u64) -> Workflow {
    let state = |offset: u64, name: &str, label: Option<&str>, next: Vec<u64>| WorkflowState {
        id: base + offset,
        name: name.into(),
        recommendation_label: label.map(str::to_string),
        next_states_id: next,
        ..Default::default()
    };
    Workflow {
        id,
        name: format!("Workflow {id}"),
        first_state_id: base,
        states: vec![
            state(0, "submitted", None, vec![base + 1, base + 2]),
            state(1, "accepted", Some("Acceptance"), vec![]),
            state(2, "rejected", Some("Rejection"), vec![]),
        ],
    }
}

/// Motion in workflow 1, state 10.
pub fn motion(id: u64, category_id: Option<u64>, submitters: &[u64], weight: i32) -> Arc<dyn Entity> {
    Arc::new(Motion {
        id,
        identifier: Some(format!("M{id}")),
        title: format!("Motion {id}"),
        category_id,
        submitters: submitters
            .iter()
            .enumerate()
            .map(|(i, user_id)| Submitter {
                user_id: *user_id,
                weight: i as i32,
            })
            .collect(),
        workflow_id: 1,
        state_id: 10,
        weight,
        ..Default::default()
    })
}

pub fn config(id: u64, key: &str, value: Value) -> Arc<dyn Entity> {
    Arc::new(Config {
        id,
        key: key.into(),
        value,
    })
}
