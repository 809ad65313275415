use std::sync::Arc;

use quorum_repo::{BaseRepository, DataSend, Prompt, Repository, ViewModel};
use quorum_store::DataStore;
use quorum_types::{EntityId, Model};
use serde::{Deserialize, Serialize};

/// One state of a motion workflow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub id: u64,
    pub name: String,
    pub recommendation_label: Option<String>,
    pub next_states_id: Vec<u64>,
    pub allow_support: bool,
    pub show_state_extension_field: bool,
}

impl WorkflowState {
    /// A state without successors ends the workflow.
    pub fn is_final(&self) -> bool {
        self.next_states_id.is_empty()
    }

    /// Successor states, resolved within `workflow`.
    pub fn next_states<'a>(&self, workflow: &'a Workflow) -> Vec<&'a WorkflowState> {
        self.next_states_id
            .iter()
            .filter_map(|id| workflow.state(*id))
            .collect()
    }
}

/// Motion workflow with its states embedded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub states: Vec<WorkflowState>,
    pub first_state_id: u64,
}

impl Workflow {
    pub fn state(&self, id: u64) -> Option<&WorkflowState> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn first_state(&self) -> Option<&WorkflowState> {
        self.state(self.first_state_id)
    }

    /// States that can be recommended.
    pub fn recommendations(&self) -> Vec<&WorkflowState> {
        self.states
            .iter()
            .filter(|s| s.recommendation_label.is_some())
            .collect()
    }
}

impl Model for Workflow {
    const COLLECTION: &'static str = "motions/workflow";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

#[derive(Clone, Debug)]
pub struct ViewWorkflow {
    workflow: Arc<Workflow>,
}

impl ViewWorkflow {
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }
}

impl ViewModel for ViewWorkflow {
    type Model = Workflow;

    fn build(workflow: Arc<Workflow>, _store: &DataStore) -> Self {
        Self { workflow }
    }

    fn model(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    fn title(&self) -> String {
        self.workflow.name.clone()
    }
}

pub struct WorkflowRepository {
    base: BaseRepository<ViewWorkflow>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl WorkflowRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            base: BaseRepository::new(store, Vec::new()),
            transport,
            prompt,
        }
    }

    /// Look up a state in any workflow.
    pub fn state(&self, id: u64) -> Option<WorkflowState> {
        self.base
            .get_view_model_list()
            .iter()
            .find_map(|w| w.workflow.state(id).cloned())
    }
}

impl Repository for WorkflowRepository {
    type View = ViewWorkflow;

    fn base(&self) -> &BaseRepository<ViewWorkflow> {
        &self.base
    }

    fn transport(&self) -> &dyn DataSend {
        self.transport.as_ref()
    }

    fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session_parts, simple_workflow};

    #[test]
    fn state_navigation() {
        let wf = simple_workflow(1, 10);
        let submitted = wf.first_state().unwrap();
        assert_eq!(submitted.name, "submitted");
        let next: Vec<&str> = submitted
            .next_states(&wf)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(next, vec!["accepted", "rejected"]);
        assert!(wf.state(11).unwrap().is_final());
        assert_eq!(wf.recommendations().len(), 2);
    }

    #[tokio::test]
    async fn repository_finds_states_across_workflows() {
        let (store, transport, prompt) = session_parts();
        store
            .add_models(vec![simple_workflow(1, 10), simple_workflow(2, 20)], None)
            .await
            .unwrap();
        let repo = WorkflowRepository::new(store, transport, prompt);
        assert_eq!(repo.state(21).unwrap().name, "accepted");
        assert!(repo.state(99).is_none());
        assert_eq!(repo.base().get_view_model(2u64).unwrap().title(), "Workflow 2");
    }
}
