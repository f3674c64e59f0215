// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locate data which is exclusively owned by a single user in a datastore guarded by declarative
//! write rules.
//!
//! Every schema node is classified as writable by no one, by exactly one identified principal or
//! by several principals. The classification of a node's own write rule is combined with the
//! effective classification of its ancestors in a single walk from the root down. Nodes which
//! end up being writable by exactly one principal are turned into deletion patterns, paths with
//! a placeholder for the user's id, which can be purged when the user's account is deleted.
mod access;
mod condition;
mod config;
mod error;
mod expression;
mod pattern;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;
pub mod walker;

pub use access::{Access, AccessStatus, Grant, validate_variable};
pub use condition::{or_conditions, substitute_identifiers};
pub use config::{PATH_SEPARATOR, RULES_ROOT, WIPEOUT_UID, WipeoutConfig};
pub use error::AccessError;
pub use expression::{Expression, RuleVerdict};
pub use pattern::DeletionPattern;
pub use walker::{NodeAccess, WalkError, classify_rules, walk_rules};
