// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the collaborators of the access engine.
mod classification;
mod classifier;

pub use classification::Classification;
pub use classifier::RuleClassifier;
