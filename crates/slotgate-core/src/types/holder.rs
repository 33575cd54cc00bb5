//! Holder identifiers minted per acquisition attempt.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one scope execution, used as the bookkeeping field name.
///
/// A fresh id is generated every time a caller enters a limited scope, so
/// nested or repeated scopes on the same key never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub Uuid);

impl HolderId {
    /// Create a new random holder id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the field name under which this holder is recorded.
    pub fn as_field(&self) -> String {
        self.0.to_string()
    }
}

impl Default for HolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for HolderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
