// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Datastore path template locating data owned by a deleted user.
///
/// The path holds the placeholder wherever the deleted user's id goes. When a condition is
/// present it must be evaluated, with the same substitution, before the data at the path may be
/// deleted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeletionPattern {
    path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
}

impl DeletionPattern {
    pub(crate) fn new(path: String, condition: Option<String>) -> Self {
        Self { path, condition }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Returns `true` if deleting the path is subject to a residual condition.
    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }
}

impl Display for DeletionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
