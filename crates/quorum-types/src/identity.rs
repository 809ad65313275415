use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Highest change id seen from the server.
///
/// Persisted next to the store snapshot and used to resume incremental
/// synchronization after a restart.
pub type ChangeId = u64;

/// Identity of an entity within its collection.
///
/// The server hands out numeric ids for almost every collection; string keys
/// exist for late-bound collections that are keyed by name. On the wire both
/// are plain JSON scalars.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(u64),
    Key(String),
}

impl EntityId {
    /// Identity from a numeric wire id. `0` means "not yet assigned".
    pub fn assigned(id: u64) -> Option<Self> {
        (id != 0).then_some(Self::Int(id))
    }

    /// Returns `true` unless this is `0` or the empty key.
    pub fn is_assigned(&self) -> bool {
        match self {
            Self::Int(id) => *id != 0,
            Self::Key(key) => !key.is_empty(),
        }
    }

    /// The numeric id, if this identity is numeric.
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Key(_) => None,
        }
    }

    /// Parse an id from a map key, preferring the numeric form.
    ///
    /// JSON object keys are always strings, so snapshot keys go through here.
    pub fn parse_key(key: &str) -> Self {
        key.parse::<u64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Key(key.to_string()))
    }

    /// Extract the `id` field of a raw payload.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        match payload.get("id")? {
            serde_json::Value::Number(n) => n.as_u64().and_then(Self::assigned),
            serde_json::Value::String(s) => Some(Self::Key(s.clone())).filter(Self::is_assigned),
            _ => None,
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for EntityId {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_key(s))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "EntityId({id})"),
            Self::Key(key) => write!(f, "EntityId({key:?})"),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}
