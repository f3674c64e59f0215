// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification results of write rules as plain values.
use serde::{Deserialize, Serialize};

use crate::access::AccessStatus;
use crate::traits::Classification;

/// Truth value a write rule evaluates to without knowing the acting principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVerdict {
    /// Anyone can write.
    True,

    /// No one can write.
    False,

    /// Depends on variables bound to the acting principal.
    Undefined,
}

/// Classified write rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    verdict: RuleVerdict,

    #[serde(default)]
    conjunctions: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,

    /// Access number reported by the classifier, derived from the verdict when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_number: Option<AccessStatus>,
}

impl Expression {
    pub fn new(verdict: RuleVerdict, conjunctions: Vec<Vec<String>>) -> Self {
        Self {
            verdict,
            conjunctions,
            condition: None,
            access_number: None,
        }
    }

    /// Classification with an access number set explicitly by the classifier.
    pub fn with_access_number(
        access_number: AccessStatus,
        conjunctions: Vec<Vec<String>>,
        condition: Option<String>,
    ) -> Self {
        let verdict = match access_number {
            AccessStatus::NoAccess => RuleVerdict::False,
            AccessStatus::MultAccess if conjunctions.is_empty() => RuleVerdict::True,
            _ => RuleVerdict::Undefined,
        };

        Self {
            verdict,
            conjunctions,
            condition,
            access_number: Some(access_number),
        }
    }

    /// Attach a residual condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn verdict(&self) -> RuleVerdict {
        self.verdict
    }
}

impl Classification for Expression {
    fn access_number(&self) -> AccessStatus {
        if let Some(access_number) = self.access_number {
            return access_number;
        }

        match self.verdict {
            RuleVerdict::False => AccessStatus::NoAccess,
            RuleVerdict::True => AccessStatus::MultAccess,
            // Several alternatives can be satisfied by different principals.
            RuleVerdict::Undefined if self.conjunctions.len() == 1 => AccessStatus::SingleAccess,
            RuleVerdict::Undefined => AccessStatus::MultAccess,
        }
    }

    fn conjunction_lists(&self) -> &[Vec<String>] {
        &self.conjunctions
    }

    fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}
