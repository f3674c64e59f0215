// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.
use std::collections::HashMap;

use thiserror::Error;

use crate::expression::{Expression, RuleVerdict};
use crate::traits::RuleClassifier;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TableClassifierError {
    #[error("no classification known for rule: {0}")]
    UnknownRule(String),
}

/// Classifier looking up pre-classified rules by their exact source text.
#[derive(Clone, Debug, Default)]
pub struct TableClassifier {
    rules: HashMap<String, Expression>,
}

impl TableClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, rule: &str, expression: Expression) -> Self {
        self.rules.insert(rule.to_owned(), expression);
        self
    }

    /// Rule granting access to no one.
    pub fn no(self, rule: &str) -> Self {
        self.insert(rule, Expression::new(RuleVerdict::False, vec![]))
    }

    /// Rule granting access to anyone.
    pub fn mult(self, rule: &str) -> Self {
        self.insert(rule, Expression::new(RuleVerdict::True, vec![]))
    }

    /// Rule granting access to the principal bound to all given variables.
    pub fn single(self, rule: &str, variables: &[&str]) -> Self {
        self.insert(rule, single_expression(variables))
    }

    /// Rule granting access to the principal bound to all given variables when the condition
    /// holds.
    pub fn single_if(self, rule: &str, variables: &[&str], condition: &str) -> Self {
        self.insert(rule, single_expression(variables).with_condition(condition))
    }
}

fn single_expression(variables: &[&str]) -> Expression {
    Expression::new(
        RuleVerdict::Undefined,
        vec![variables.iter().map(|v| v.to_string()).collect()],
    )
}

impl RuleClassifier for TableClassifier {
    type Output = Expression;
    type Error = TableClassifierError;

    fn classify(&self, rule: &str, _path: &[String]) -> Result<Self::Output, Self::Error> {
        self.rules
            .get(rule)
            .cloned()
            .ok_or_else(|| TableClassifierError::UnknownRule(rule.to_owned()))
    }
}
