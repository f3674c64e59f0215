// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::access::AccessStatus;

/// Interface for the classification result of a single write rule.
///
/// A rule classifier inspects the source of one write rule and reports which population of
/// principals the rule grants access to. When exactly one principal is granted access the
/// classifier also reports the variables which must be bound to that principal's id.
pub trait Classification {
    /// Access number of the classified rule.
    fn access_number(&self) -> AccessStatus;

    /// Disjunction of conjunctions of variable names.
    ///
    /// Every inner list holds the variables which all must equal the acting principal's id for
    /// the rule to grant access. The outer list holds the alternatives.
    fn conjunction_lists(&self) -> &[Vec<String>];

    /// Residual condition which must hold in addition to the identity bindings.
    fn condition(&self) -> Option<&str>;
}
