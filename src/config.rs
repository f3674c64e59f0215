// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Placeholder standing in for the deleted user's id in deletion patterns.
pub const WIPEOUT_UID: &str = "#WIPEOUT_UID";

/// Marker of the root segment of rule schema paths.
pub const RULES_ROOT: &str = "rules";

/// Separator of datastore path segments.
pub const PATH_SEPARATOR: &str = "/";

/// Configuration for deriving deletion patterns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WipeoutConfig {
    /// Token substituted for the id of the deleted user.
    pub(crate) placeholder: String,

    /// First segment of every schema path, it is dropped in deletion patterns which are rooted at
    /// the datastore root instead.
    pub(crate) root: String,

    pub(crate) separator: String,
}

impl Default for WipeoutConfig {
    fn default() -> Self {
        Self {
            placeholder: WIPEOUT_UID.to_string(),
            root: RULES_ROOT.to_string(),
            separator: PATH_SEPARATOR.to_string(),
        }
    }
}

impl WipeoutConfig {
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}
