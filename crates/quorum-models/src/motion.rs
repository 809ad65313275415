use std::sync::Arc;

use quorum_repo::{BaseRepository, DataSend, Patch, Prompt, RepoError, RepoResult, Repository, ViewModel};
use quorum_store::{ChangeEvent, DataStore};
use quorum_types::{EntityId, Model};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::category::Category;
use crate::user::User;
use crate::workflow::{Workflow, WorkflowState};

/// Submitter entry of a motion. Lower weights are listed first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submitter {
    pub user_id: u64,
    pub weight: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motion {
    pub id: u64,
    pub identifier: Option<String>,
    pub title: String,
    pub text: String,
    pub reason: String,
    pub category_id: Option<u64>,
    pub submitters: Vec<Submitter>,
    pub supporters_id: Vec<u64>,
    pub workflow_id: u64,
    pub state_id: u64,
    pub weight: i32,
    pub sort_parent_id: Option<u64>,
}

impl Motion {
    /// Submitter user ids ordered by weight.
    pub fn submitter_ids(&self) -> Vec<u64> {
        let mut submitters = self.submitters.clone();
        submitters.sort_by_key(|s| s.weight);
        submitters.into_iter().map(|s| s.user_id).collect()
    }
}

impl Model for Motion {
    const COLLECTION: &'static str = "motions/motion";

    fn identity(&self) -> Option<EntityId> {
        EntityId::assigned(self.id)
    }
}

/// A motion with its category, users, workflow and state resolved.
#[derive(Clone, Debug)]
pub struct ViewMotion {
    motion: Arc<Motion>,
    category: Option<Arc<Category>>,
    submitters: Vec<Arc<User>>,
    supporters: Vec<Arc<User>>,
    workflow: Option<Arc<Workflow>>,
    state: Option<WorkflowState>,
}

impl ViewMotion {
    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_deref()
    }

    pub fn submitters(&self) -> &[Arc<User>] {
        &self.submitters
    }

    pub fn supporters(&self) -> &[Arc<User>] {
        &self.supporters
    }

    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_deref()
    }

    pub fn state(&self) -> Option<&WorkflowState> {
        self.state.as_ref()
    }

    pub fn identifier_or_title(&self) -> &str {
        self.motion
            .identifier
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or(&self.motion.title)
    }

    pub fn is_final_state(&self) -> bool {
        self.state.as_ref().is_some_and(WorkflowState::is_final)
    }

    /// States reachable from the current one.
    pub fn next_states(&self) -> Vec<WorkflowState> {
        match (&self.state, &self.workflow) {
            (Some(state), Some(workflow)) => {
                state.next_states(workflow).into_iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    fn resolve_state(&mut self) {
        self.state = self
            .workflow
            .as_ref()
            .and_then(|w| w.state(self.motion.state_id).cloned());
    }
}

/// Rebuild a user list in `ids` order, taking `changed` over `current`.
fn refresh_users(ids: &[u64], current: &[Arc<User>], changed: &Arc<User>) -> Vec<Arc<User>> {
    ids.iter()
        .filter_map(|id| {
            if *id == changed.id {
                Some(Arc::clone(changed))
            } else {
                current.iter().find(|u| u.id == *id).cloned()
            }
        })
        .collect()
}

impl ViewModel for ViewMotion {
    type Model = Motion;

    fn build(motion: Arc<Motion>, store: &DataStore) -> Self {
        let category = motion
            .category_id
            .and_then(|id| store.get_typed::<Category>(id));
        let submitters = motion
            .submitter_ids()
            .into_iter()
            .filter_map(|id| store.get_typed::<User>(id))
            .collect();
        let supporters = motion
            .supporters_id
            .iter()
            .filter_map(|id| store.get_typed::<User>(*id))
            .collect();
        let workflow = store.get_typed::<Workflow>(motion.workflow_id);
        let mut view = Self {
            motion,
            category,
            submitters,
            supporters,
            workflow,
            state: None,
        };
        view.resolve_state();
        view
    }

    fn model(&self) -> &Arc<Motion> {
        &self.motion
    }

    /// `"{identifier} - {title}"`, or the bare title.
    fn title(&self) -> String {
        match self.motion.identifier.as_deref().filter(|i| !i.is_empty()) {
            Some(identifier) => format!("{identifier} - {}", self.motion.title),
            None => self.motion.title.clone(),
        }
    }

    fn depends_on(&self, change: &ChangeEvent) -> bool {
        let Some(id) = change.id.as_int() else {
            return false;
        };
        if change.is::<Category>() {
            self.motion.category_id == Some(id)
        } else if change.is::<User>() {
            self.motion.submitters.iter().any(|s| s.user_id == id)
                || self.motion.supporters_id.contains(&id)
        } else if change.is::<Workflow>() {
            self.motion.workflow_id == id
        } else {
            false
        }
    }

    fn update_values(&mut self, change: &ChangeEvent) {
        if let Some(category) = change.downcast::<Category>() {
            if self.motion.category_id == Some(category.id) {
                self.category = Some(category);
            }
        } else if let Some(user) = change.downcast::<User>() {
            let submitter_ids = self.motion.submitter_ids();
            if submitter_ids.contains(&user.id) {
                self.submitters = refresh_users(&submitter_ids, &self.submitters, &user);
            }
            if self.motion.supporters_id.contains(&user.id) {
                self.supporters = refresh_users(&self.motion.supporters_id, &self.supporters, &user);
            }
        } else if let Some(workflow) = change.downcast::<Workflow>() {
            if self.motion.workflow_id == workflow.id {
                self.workflow = Some(workflow);
                self.resolve_state();
            }
        }
    }
}

pub struct MotionRepository {
    base: BaseRepository<ViewMotion>,
    transport: Arc<dyn DataSend>,
    prompt: Arc<dyn Prompt>,
}

impl MotionRepository {
    pub fn new(store: Arc<DataStore>, transport: Arc<dyn DataSend>, prompt: Arc<dyn Prompt>) -> Self {
        let dependencies = vec![
            Category::collection_id(),
            User::collection_id(),
            Workflow::collection_id(),
        ];
        Self {
            base: BaseRepository::new(store, dependencies),
            transport,
            prompt,
        }
    }

    /// Move a motion to another state of its workflow.
    pub async fn set_state(&self, view: &ViewMotion, state_id: u64) -> RepoResult<Arc<Motion>> {
        let known = view
            .workflow
            .as_ref()
            .is_some_and(|w| w.state(state_id).is_some());
        if !known {
            return Err(RepoError::Unsupported("state is not part of the motion's workflow"));
        }
        self.update(patch(json!({ "state_id": state_id })), view).await
    }

    /// Assign a category, or remove it with `None`.
    pub async fn set_category(
        &self,
        view: &ViewMotion,
        category_id: Option<u64>,
    ) -> RepoResult<Arc<Motion>> {
        self.update(patch(json!({ "category_id": category_id })), view)
            .await
    }

    /// Motions of a category, ordered by weight.
    pub fn in_category(&self, category_id: u64) -> Vec<Arc<ViewMotion>> {
        let mut motions: Vec<Arc<ViewMotion>> = self
            .base
            .get_view_model_list()
            .into_iter()
            .filter(|m| m.motion.category_id == Some(category_id))
            .collect();
        motions.sort_by_key(|m| (m.motion.weight, m.motion.id));
        motions
    }
}

fn patch(value: Value) -> Patch {
    match value {
        Value::Object(fields) => fields,
        _ => Patch::new(),
    }
}

impl Repository for MotionRepository {
    type View = ViewMotion;

    fn base(&self) -> &BaseRepository<ViewMotion> {
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
    use crate::testing::{category, motion, session_parts, simple_workflow, user};
    use quorum_repo::NeverConfirm;
    use quorum_types::Entity;

    async fn seeded() -> MotionRepository {
        let (store, transport, prompt) = session_parts();
        let mut entities: Vec<Arc<dyn Entity>> = vec![
            category(1, "Budget", 10),
            Arc::new(user(5, "Ann")),
            Arc::new(user(6, "Bob")),
            Arc::new(simple_workflow(1, 10)),
        ];
        entities.push(motion(100, Some(1), &[6, 5], 10));
        store.add(entities, Some(1)).await.unwrap();
        MotionRepository::new(store, transport, prompt)
    }

    #[tokio::test]
    async fn view_resolves_references() {
        let repo = seeded().await;
        let view = repo.base().get_view_model(100u64).unwrap();
        assert_eq!(view.category().unwrap().name, "Budget");
        let submitters: Vec<&str> = view.submitters().iter().map(|u| u.first_name.as_str()).collect();
        assert_eq!(submitters, vec!["Bob", "Ann"]);
        assert_eq!(view.state().unwrap().name, "submitted");
        assert_eq!(view.next_states().len(), 2);
        assert!(!view.is_final_state());
        assert_eq!(view.title(), "M100 - Motion 100");
    }

    #[tokio::test]
    async fn dependency_updates_reach_view() {
        let repo = seeded().await;
        let store = Arc::clone(repo.base().store());
        let mut list = repo.base().list_stream();

        store.add(vec![category(1, "Finance", 10)], None).await.unwrap();
        assert!(list.has_changed().unwrap());
        list.borrow_and_update();
        let view = repo.base().get_view_model(100u64).unwrap();
        assert_eq!(view.category().unwrap().name, "Finance");

        store.add_models(vec![user(5, "Anna")], None).await.unwrap();
        let view = repo.base().get_view_model(100u64).unwrap();
        let names: Vec<&str> = view.submitters().iter().map(|u| u.first_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Anna"]);
    }

    #[tokio::test]
    async fn unrelated_category_does_not_touch_view() {
        let repo = seeded().await;
        let before = repo.base().get_view_model(100u64).unwrap();
        repo.base()
            .store()
            .add(vec![category(2, "Other", 20)], None)
            .await
            .unwrap();
        let after = repo.base().get_view_model(100u64).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.category().unwrap().name, "Budget");
    }

    #[tokio::test]
    async fn late_dependency_fills_missing_reference() {
        let (store, transport, prompt) = session_parts();
        store.add(vec![motion(1, None, &[9], 0)], None).await.unwrap();
        let repo = MotionRepository::new(Arc::clone(&store), transport, prompt);
        assert!(repo.base().get_view_model(1u64).unwrap().submitters().is_empty());

        store.add_models(vec![user(9, "Late")], None).await.unwrap();
        assert_eq!(repo.base().get_view_model(1u64).unwrap().submitters().len(), 1);
    }

    #[tokio::test]
    async fn set_state_and_category() {
        let repo = seeded().await;
        let view = repo.base().get_view_model(100u64).unwrap();

        repo.set_state(&view, 11).await.unwrap();
        let view = repo.base().get_view_model(100u64).unwrap();
        assert_eq!(view.state().unwrap().name, "accepted");
        assert!(view.is_final_state());

        let err = repo.set_state(&view, 99).await.unwrap_err();
        assert!(matches!(err, RepoError::Unsupported(_)));

        repo.set_category(&view, None).await.unwrap();
        assert!(repo.base().get_view_model(100u64).unwrap().category().is_none());
    }

    #[tokio::test]
    async fn declined_delete_keeps_motion() {
        let (store, transport, _) = session_parts();
        store.add(vec![motion(1, None, &[], 0)], None).await.unwrap();
        let repo = MotionRepository::new(store, transport, Arc::new(NeverConfirm));
        let view = repo.base().get_view_model(1u64).unwrap();
        assert!(repo.delete(&view).await.unwrap_err().is_dialog_closed());
        assert!(repo.base().get_view_model(1u64).is_some());
    }

    #[tokio::test]
    async fn in_category_orders_by_weight() {
        let (store, transport, prompt) = session_parts();
        store
            .add(
                vec![motion(1, Some(3), &[], 20), motion(2, Some(3), &[], 10), motion(3, None, &[], 0)],
                None,
            )
            .await
            .unwrap();
        let repo = MotionRepository::new(store, transport, prompt);
        let ids: Vec<u64> = repo.in_category(3).iter().map(|m| m.motion().id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
