// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-down walk over a rules document, deriving deletion patterns for every subtree which is
//! exclusively writable by a single user.
//!
//! Rules documents nest schema nodes as JSON objects below a root key. Keys starting with a `.`
//! hold rules of the enclosing node, every other key is a child node. Only `.write` rules are
//! classified, a node without one contributes no access of its own.
use std::error::Error;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::access::Access;
use crate::config::WipeoutConfig;
use crate::error::AccessError;
use crate::pattern::DeletionPattern;
use crate::traits::RuleClassifier;

/// Key of the write rule of a node.
pub const WRITE_RULE: &str = ".write";

#[derive(Debug, Error)]
pub enum WalkError<E>
where
    E: Error,
{
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("failed classifying write rule at {0}: {1}")]
    Classifier(String, E),

    #[error("write rule at {0} is neither a string nor a boolean")]
    MalformedRule(String),

    #[error("node at {0} is not an object")]
    MalformedNode(String),

    #[error("rules document has no '{0}' root")]
    MissingRoot(String),
}

/// Schema node with its effective access and the effective access of all its descendants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAccess {
    path: Vec<String>,
    access: Access,
    children: Vec<NodeAccess>,
    shared_below: bool,
}

impl NodeAccess {
    /// Schema path of the node, starting with the root marker.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Effective access of the node.
    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn children(&self) -> &[NodeAccess] {
        &self.children
    }

    /// Returns `true` if this node or any of its descendants can be written by more than one
    /// principal.
    pub fn is_shared(&self) -> bool {
        self.access.is_mult_access() || self.shared_below
    }

    /// Find a node by its path segments below the root.
    pub fn find(&self, segments: &[&str]) -> Option<&NodeAccess> {
        match segments.split_first() {
            None => Some(self),
            Some((segment, rest)) => self
                .children
                .iter()
                .find(|child| child.path.last().is_some_and(|last| last == segment))
                .and_then(|child| child.find(rest)),
        }
    }
}

/// Derive the effective access of every node in the rules document.
pub fn classify_rules<C>(
    rules: &Value,
    classifier: &C,
    config: &WipeoutConfig,
) -> Result<NodeAccess, WalkError<C::Error>>
where
    C: RuleClassifier,
{
    let root = rules
        .get(config.root())
        .ok_or_else(|| WalkError::MissingRoot(config.root().to_owned()))?;

    classify_node(
        root,
        vec![config.root().to_owned()],
        &Access::NoAccess,
        classifier,
        config,
    )
}

fn classify_node<C>(
    node: &Value,
    path: Vec<String>,
    ancestor: &Access,
    classifier: &C,
    config: &WipeoutConfig,
) -> Result<NodeAccess, WalkError<C::Error>>
where
    C: RuleClassifier,
{
    let Value::Object(node) = node else {
        return Err(WalkError::MalformedNode(path.join(config.separator())));
    };

    let rule = rule_access(node, &path, classifier, config)?;
    let access = Access::combine_with_ancestor(ancestor, &rule);

    let children = node
        .iter()
        .filter(|(key, _)| !key.starts_with('.'))
        .map(|(key, child)| {
            let mut child_path = path.clone();
            child_path.push(key.to_owned());
            classify_node(child, child_path, &access, classifier, config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let shared_below = children.iter().any(NodeAccess::is_shared);

    Ok(NodeAccess {
        path,
        access,
        children,
        shared_below,
    })
}

fn rule_access<C>(
    node: &Map<String, Value>,
    path: &[String],
    classifier: &C,
    config: &WipeoutConfig,
) -> Result<Access, WalkError<C::Error>>
where
    C: RuleClassifier,
{
    match node.get(WRITE_RULE) {
        None | Some(Value::Bool(false)) => Ok(Access::NoAccess),
        Some(Value::Bool(true)) => Ok(Access::MultAccess),
        Some(Value::String(rule)) => {
            let expression = classifier
                .classify(rule, path)
                .map_err(|err| WalkError::Classifier(path.join(config.separator()), err))?;
            Ok(Access::from_expression_at(&expression, path)?)
        }
        Some(_) => Err(WalkError::MalformedRule(path.join(config.separator()))),
    }
}

/// Walk the rules document and return the deletion patterns of all data exclusively owned by
/// a single user.
///
/// Every returned pattern covers a whole subtree, apart from descendants which are owned under a
/// different condition and come with a pattern of their own. Subtrees containing a node which is
/// shared between several principals are never covered as a whole, only their exclusively owned
/// descendants are.
pub fn walk_rules<C>(
    rules: &Value,
    classifier: &C,
    config: &WipeoutConfig,
) -> Result<Vec<DeletionPattern>, WalkError<C::Error>>
where
    C: RuleClassifier,
{
    let root = classify_rules(rules, classifier, config)?;

    let mut patterns = Vec::new();
    collect_patterns(&root, config, &mut patterns)?;
    patterns.sort();
    patterns.dedup();

    Ok(patterns)
}

fn collect_patterns(
    node: &NodeAccess,
    config: &WipeoutConfig,
    patterns: &mut Vec<DeletionPattern>,
) -> Result<(), AccessError> {
    if node.access.is_single_access() {
        if !node.shared_below {
            push_pattern(node, config, patterns)?;
            return collect_conditional_patterns(node, node.access.condition(), config, patterns);
        }

        warn!(
            path = %node.path.join(config.separator()),
            "single user node has shared descendants, only deleting owned subtrees"
        );
    }

    for child in &node.children {
        collect_patterns(child, config, patterns)?;
    }

    Ok(())
}

/// Descendants of an owned subtree whose effective condition differs from the condition of the
/// pattern covering them need patterns of their own.
///
/// A descendant's condition is the OR of its ancestor's and its own rule's condition, data below
/// can still be owned by the user when the covering pattern's condition doesn't hold.
fn collect_conditional_patterns(
    node: &NodeAccess,
    covering: Option<&str>,
    config: &WipeoutConfig,
    patterns: &mut Vec<DeletionPattern>,
) -> Result<(), AccessError> {
    for child in &node.children {
        let condition = child.access.condition();
        if condition != covering {
            push_pattern(child, config, patterns)?;
        }
        collect_conditional_patterns(child, condition, config, patterns)?;
    }

    Ok(())
}

fn push_pattern(
    node: &NodeAccess,
    config: &WipeoutConfig,
    patterns: &mut Vec<DeletionPattern>,
) -> Result<(), AccessError> {
    let pattern = node
        .access
        .to_deletion_pattern_with(node.path.as_slice(), config)?;
    debug!(%pattern, condition = ?pattern.condition(), "found user owned data");
    patterns.push(pattern);
    Ok(())
}
