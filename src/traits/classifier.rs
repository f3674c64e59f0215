// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::traits::Classification;

/// Interface for classifying the source text of a write rule.
///
/// The rule language itself is not interpreted by this crate, a classifier is handed the raw
/// rule source together with the schema path it is attached to and returns its classification.
pub trait RuleClassifier {
    type Output: Classification;
    type Error: Error;

    /// Classify the write rule found at the given schema path.
    ///
    /// The path starts with the schema root marker and lists every segment down to the node
    /// holding the rule, wildcard segments included.
    fn classify(&self, rule: &str, path: &[String]) -> Result<Self::Output, Self::Error>;
}
