use quorum_types::{Entity, Model};
use serde_json::{Map, Value};

use crate::error::{RepoError, RepoResult};

/// Partial update: top-level fields to overwrite.
pub type Patch = Map<String, Value>;

/// Merge `patch` shallowly over the serialized form of `model`.
///
/// The `id` field is never patched.
pub fn apply_patch<M: Model>(model: &M, patch: &Patch) -> RepoResult<M> {
    let mut value = model.to_json()?;
    let Value::Object(fields) = &mut value else {
        return Err(RepoError::Patch(format!(
            "{} does not serialize to an object",
            M::COLLECTION
        )));
    };
    for (key, field) in patch {
        if key == "id" {
            continue;
        }
        fields.insert(key.clone(), field.clone());
    }
    Ok(M::from_json(value)?)
}
