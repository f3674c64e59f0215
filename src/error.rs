// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::access::AccessStatus;

/// Errors raised while constructing or projecting access values.
///
/// All of them are fatal for the node which is being classified and are surfaced to the caller,
/// an access value which can't be trusted must never turn into a deletion pattern.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("not a valid access status: {0}")]
    InvalidStatus(String),

    #[error("not a valid list of variables for single access: {0}")]
    InvalidVariableList(String),

    #[error("a valid path starts with '{0}'")]
    InvalidPath(String),

    #[error("write rule is using unknown variable: {0}")]
    UnknownVariableInPath(String),

    #[error("deletion patterns can only be derived from single access, found {0}")]
    NotSingleAccess(AccessStatus),
}
