use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Collection string reserved for abstract base entities.
///
/// Entities reporting this collection can never be stored.
pub const INVALID_COLLECTION: &str = "invalid-collection-string";

/// Namespace identifier of an entity type, e.g. `"motions/motion"`.
///
/// The first path segment names the app, the second the resource. The
/// collection is the primary partition key of the object store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(Cow<'static, str>);

impl CollectionId {
    /// The sentinel collection of abstract base entities.
    pub const INVALID: CollectionId = CollectionId(Cow::Borrowed(INVALID_COLLECTION));

    /// Wrap a compile-time collection string without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Wrap a runtime collection string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the abstract base sentinel.
    pub fn is_invalid(&self) -> bool {
        self.as_str() == INVALID_COLLECTION
    }

    /// The app segment (`"motions"` for `"motions/motion"`).
    pub fn app(&self) -> &str {
        self.as_str().split('/').next().unwrap_or_default()
    }

    /// REST resource path for the whole collection: `rest/{collection}/`.
    pub fn resource_path(&self) -> String {
        format!("rest/{}/", self.as_str())
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionId({})", self.as_str())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for CollectionId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for CollectionId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for CollectionId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
