//! Domain models of Quorum and their repositories.
//!
//! Each module holds one entity type: the serde model, its view model and
//! its repository.
//!
//! | collection         | model        | repository             |
//! |--------------------|--------------|------------------------|
//! | `motions/category` | [`Category`] | [`CategoryRepository`] |
//! | `motions/workflow` | [`Workflow`] | [`WorkflowRepository`] |
//! | `motions/motion`   | [`Motion`]   | [`MotionRepository`]   |
//! | `users/user`       | [`User`]     | [`UserRepository`]     |
//! | `core/config`      | [`Config`]   | [`ConfigRepository`]   |

pub mod category;
pub mod config;
pub mod motion;
pub mod user;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use quorum_store::ModelDescriptor;

pub use category::{Category, CategoryRepository, ViewCategory};
pub use config::{
    Config, ConfigGroup, ConfigItem, ConfigRepository, ConfigSubgroup, ConstantGroup,
    ConstantItem, ConstantSubgroup, ViewConfig,
};
pub use motion::{Motion, MotionRepository, Submitter, ViewMotion};
pub use user::{User, UserRepository, ViewUser};
pub use workflow::{ViewWorkflow, Workflow, WorkflowRepository, WorkflowState};

/// Every compiled-in entity type.
pub static MODELS: &[ModelDescriptor] = &[
    ModelDescriptor::of::<Category>(),
    ModelDescriptor::of::<Workflow>(),
    ModelDescriptor::of::<Motion>(),
    ModelDescriptor::of::<User>(),
    ModelDescriptor::of::<Config>(),
];

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_store::Registry;
    use quorum_types::Model;

    #[test]
    fn every_model_is_registered_once() {
        let registry = Registry::with_models(MODELS);
        let names: Vec<String> = registry.collections().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "core/config",
                "motions/category",
                "motions/motion",
                "motions/workflow",
                "users/user"
            ]
        );
        assert_eq!(registry.collection_of::<Motion>(), Some(Motion::collection_id()));
    }
}
