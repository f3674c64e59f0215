// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access classification of schema nodes and the top-down combination of ancestor and rule
//! access.
use std::fmt::Display;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::condition::{or_conditions, substitute_identifiers};
use crate::config::WipeoutConfig;
use crate::error::AccessError;
use crate::pattern::DeletionPattern;
use crate::traits::Classification;

/// The three access states a schema node can be in.
///
/// Note that the states are not ordered: a node which no one can access is not "less accessible"
/// than one a single principal can access in any sense the engine relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// No principal can write to the node.
    NoAccess = 0,

    /// Exactly one identified principal can write to the node.
    SingleAccess = 1,

    /// More than one, or an indeterminate number of principals can write to the node.
    MultAccess = 2,
}

impl Display for AccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessStatus::NoAccess => "none",
            AccessStatus::SingleAccess => "single",
            AccessStatus::MultAccess => "multiple",
        };

        write!(f, "{}", s)
    }
}

impl TryFrom<u8> for AccessStatus {
    type Error = AccessError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessStatus::NoAccess),
            1 => Ok(AccessStatus::SingleAccess),
            2 => Ok(AccessStatus::MultAccess),
            _ => Err(AccessError::InvalidStatus(value.to_string())),
        }
    }
}

impl FromStr for AccessStatus {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "NO_ACCESS" => Ok(AccessStatus::NoAccess),
            "single" | "SINGLE_ACCESS" => Ok(AccessStatus::SingleAccess),
            "multiple" | "MULT_ACCESS" => Ok(AccessStatus::MultAccess),
            _ => Err(AccessError::InvalidStatus(s.to_owned())),
        }
    }
}

/// Checks that a variable name is a plain identifier.
///
/// 1. It is not empty
/// 2. It may begin with a `$` (wildcard variables of the rules schema)
/// 3. It continues with a letter or underscore
/// 4. It uses only alphanumeric characters, digits and the underscore character
pub fn validate_variable(value: &str) -> bool {
    static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new(r"^\$?[A-Za-z_][A-Za-z0-9_]*$").unwrap()
    });

    VARIABLE_REGEX.is_match(value)
}

/// Payload of a node which exactly one principal can access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Grant {
    /// Variables which all must be bound to the principal's id for access to be granted.
    variables: Vec<String>,

    /// Residual condition which must additionally hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
}

impl Grant {
    /// Construct and validate a grant for a single principal.
    pub fn new(variables: Vec<String>, condition: Option<String>) -> Result<Self, AccessError> {
        if variables.is_empty() {
            return Err(AccessError::InvalidVariableList(
                "list can't be empty".to_string(),
            ));
        }

        if let Some(invalid) = variables.iter().find(|variable| !validate_variable(variable)) {
            return Err(AccessError::InvalidVariableList(format!(
                "'{}' is not an identifier",
                invalid
            )));
        }

        Ok(Self {
            variables,
            condition,
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Returns `true` if every variable of this grant is also bound by the other one.
    fn is_subset_of(&self, other: &Grant) -> bool {
        self.variables
            .iter()
            .all(|variable| other.variables.contains(variable))
    }
}

impl<'de> Deserialize<'de> for Grant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawGrant {
            variables: Vec<String>,
            #[serde(default)]
            condition: Option<String>,
        }

        let raw = RawGrant::deserialize(deserializer)?;

        // Check variables
        Grant::new(raw.variables, raw.condition)
            .map_err(|err| serde::de::Error::custom(format!("invalid grant, {}", err)))
    }
}

/// Access classification of one schema node.
///
/// Either derived from a single write rule or the effective access of a node after combining its
/// rule with the effective access of its ancestors. Only single access carries a payload, the
/// other states are plain markers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Access {
    #[default]
    NoAccess,
    SingleAccess(Grant),
    MultAccess,
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::SingleAccess(grant) => {
                write!(f, "single [{}]", grant.variables.join(", "))?;
                if let Some(condition) = &grant.condition {
                    write!(f, " if {}", condition)?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.status()),
        }
    }
}

impl Access {
    /// Construct an access value from its parts.
    ///
    /// Variables and condition are ignored for any status other than single access. For single
    /// access the variables must be a non-empty list of identifiers.
    pub fn new(
        status: AccessStatus,
        variables: Vec<String>,
        condition: Option<String>,
    ) -> Result<Self, AccessError> {
        match status {
            AccessStatus::NoAccess => Ok(Access::NoAccess),
            AccessStatus::MultAccess => Ok(Access::MultAccess),
            AccessStatus::SingleAccess => {
                Ok(Access::SingleAccess(Grant::new(variables, condition)?))
            }
        }
    }

    /// Single access for the given variables without residual condition.
    pub fn single<I, S>(variables: I) -> Result<Self, AccessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables = variables.into_iter().map(Into::into).collect();
        Ok(Access::SingleAccess(Grant::new(variables, None)?))
    }

    /// Attach a residual condition to single access, other states are returned unchanged.
    pub fn with_condition(self, condition: impl Into<String>) -> Self {
        match self {
            Access::SingleAccess(grant) => Access::SingleAccess(Grant {
                condition: Some(condition.into()),
                ..grant
            }),
            access => access,
        }
    }

    /// Derive the access of a write rule from its classification.
    ///
    /// When the classification reports single access through several alternative conjunctions,
    /// only the first alternative is kept as the representative variable set.
    pub fn from_expression<E>(expression: &E) -> Result<Self, AccessError>
    where
        E: Classification,
    {
        match expression.access_number() {
            AccessStatus::NoAccess => Ok(Access::NoAccess),
            AccessStatus::MultAccess => Ok(Access::MultAccess),
            AccessStatus::SingleAccess => {
                let variables = expression
                    .conjunction_lists()
                    .first()
                    .cloned()
                    .unwrap_or_default();
                Access::new(
                    AccessStatus::SingleAccess,
                    variables,
                    expression.condition().map(str::to_owned),
                )
            }
        }
    }

    /// Derive the access of a write rule attached to the node at the given schema path.
    ///
    /// Fails when the rule binds a variable which is not a segment of the path, this indicates a
    /// mismatch between the rule and the schema it is attached to.
    pub fn from_expression_at<E, S>(expression: &E, path: &[S]) -> Result<Self, AccessError>
    where
        E: Classification,
        S: AsRef<str>,
    {
        let access = Self::from_expression(expression)?;
        if let Access::SingleAccess(grant) = &access {
            check_variables_in_path(grant, path)?;
        }
        Ok(access)
    }

    /// Combine the effective access of an ancestor with the access of the rule at the current
    /// node, returning the effective access of the current node.
    ///
    /// The ancestor access must already be effective (folded with its own ancestors), never the
    /// raw access of the ancestor's rule. A single walk from the root down is then sufficient to
    /// classify every node.
    pub fn combine_with_ancestor(ancestor: &Access, rule: &Access) -> Access {
        let result = match (ancestor, rule) {
            (Access::MultAccess, _) => Access::MultAccess,
            (Access::NoAccess, rule) => rule.clone(),
            (Access::SingleAccess(_), Access::NoAccess) => ancestor.clone(),
            (Access::SingleAccess(_), Access::MultAccess) => Access::MultAccess,
            (Access::SingleAccess(ancestor), Access::SingleAccess(rule)) => {
                // If the ancestor's variables are a subset of the rule's, the rule doesn't grant
                // access to anyone the ancestor didn't already.
                if ancestor.is_subset_of(rule) {
                    Access::SingleAccess(Grant {
                        variables: ancestor.variables.clone(),
                        condition: or_conditions(
                            ancestor.condition.as_deref(),
                            rule.condition.as_deref(),
                        ),
                    })
                } else {
                    Access::MultAccess
                }
            }
        };

        trace!(%ancestor, %rule, %result, "combined ancestor with rule access");
        result
    }

    pub fn status(&self) -> AccessStatus {
        match self {
            Access::NoAccess => AccessStatus::NoAccess,
            Access::SingleAccess(_) => AccessStatus::SingleAccess,
            Access::MultAccess => AccessStatus::MultAccess,
        }
    }

    /// Variables bound to the principal's id, empty for anything but single access.
    pub fn variables(&self) -> &[String] {
        match self {
            Access::SingleAccess(grant) => grant.variables(),
            _ => &[],
        }
    }

    /// Residual condition, only single access carries one.
    pub fn condition(&self) -> Option<&str> {
        match self {
            Access::SingleAccess(grant) => grant.condition(),
            _ => None,
        }
    }

    /// Access is NoAccess.
    pub fn is_no_access(&self) -> bool {
        matches!(self, Access::NoAccess)
    }

    /// Access is SingleAccess.
    pub fn is_single_access(&self) -> bool {
        matches!(self, Access::SingleAccess(_))
    }

    /// Access is MultAccess.
    pub fn is_mult_access(&self) -> bool {
        matches!(self, Access::MultAccess)
    }

    /// Project single access at the given schema path into a deletion pattern, using the default
    /// configuration.
    pub fn to_deletion_pattern<S>(&self, path: &[S]) -> Result<DeletionPattern, AccessError>
    where
        S: AsRef<str>,
    {
        self.to_deletion_pattern_with(path, &WipeoutConfig::default())
    }

    /// Project single access at the given schema path into a deletion pattern.
    ///
    /// Every path segment naming a bound variable is replaced with the placeholder for the
    /// deleted user's id and the schema root marker becomes the datastore root. Bound variables
    /// inside the residual condition are replaced the same way.
    pub fn to_deletion_pattern_with<S>(
        &self,
        path: &[S],
        config: &WipeoutConfig,
    ) -> Result<DeletionPattern, AccessError>
    where
        S: AsRef<str>,
    {
        let Access::SingleAccess(grant) = self else {
            return Err(AccessError::NotSingleAccess(self.status()));
        };

        match path.first() {
            Some(first) if first.as_ref() == config.root() => (),
            _ => return Err(AccessError::InvalidPath(config.root().to_owned())),
        }

        check_variables_in_path(grant, path)?;

        let segments: Vec<&str> = path
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let segment = segment.as_ref();
                if index == 0 {
                    ""
                } else if grant.variables.iter().any(|variable| variable == segment) {
                    config.placeholder()
                } else {
                    segment
                }
            })
            .collect();

        let condition = grant.condition.as_deref().map(|condition| {
            substitute_identifiers(condition, &grant.variables, config.placeholder())
        });

        Ok(DeletionPattern::new(
            segments.join(config.separator()),
            condition,
        ))
    }
}

fn check_variables_in_path<S>(grant: &Grant, path: &[S]) -> Result<(), AccessError>
where
    S: AsRef<str>,
{
    match grant
        .variables
        .iter()
        .find(|variable| !path.iter().any(|segment| segment.as_ref() == variable.as_str()))
    {
        Some(unknown) => Err(AccessError::UnknownVariableInPath(unknown.to_owned())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;

    use crate::config::WipeoutConfig;
    use crate::error::AccessError;
    use crate::expression::{Expression, RuleVerdict};

    use super::{Access, AccessStatus, validate_variable};

    fn single(variables: &[&str]) -> Access {
        Access::single(variables.iter().copied()).unwrap()
    }

    #[test]
    fn rejects_invalid_single_access() {
        assert_matches!(
            Access::new(AccessStatus::SingleAccess, vec![], None),
            Err(AccessError::InvalidVariableList(_))
        );
        assert_matches!(
            Access::new(AccessStatus::SingleAccess, vec!["".to_string()], None),
            Err(AccessError::InvalidVariableList(_))
        );
        assert_matches!(
            Access::new(AccessStatus::SingleAccess, vec!["a b".to_string()], None),
            Err(AccessError::InvalidVariableList(_))
        );
        assert_matches!(
            AccessStatus::try_from(3u8),
            Err(AccessError::InvalidStatus(_))
        );
        assert_matches!(
            "true".parse::<AccessStatus>(),
            Err(AccessError::InvalidStatus(_))
        );
    }

    #[test]
    fn keeps_exact_variable_list() {
        let access = Access::new(
            AccessStatus::SingleAccess,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            None,
        )
        .unwrap();

        assert_eq!(access.status(), AccessStatus::SingleAccess);
        assert_eq!(access.variables(), ["a", "b", "c"]);
        assert_eq!(access.condition(), None);
    }

    #[test]
    fn empty_payload_without_single_access() {
        let no = Access::new(
            AccessStatus::NoAccess,
            vec!["a".to_string(), "b".to_string()],
            Some("x".to_string()),
        )
        .unwrap();
        let mult = Access::new(AccessStatus::MultAccess, vec![], Some("x".to_string())).unwrap();

        assert_eq!(no, Access::NoAccess);
        assert!(no.variables().is_empty());
        assert_eq!(no.condition(), None);
        assert_eq!(mult, Access::MultAccess);
        assert!(mult.variables().is_empty());

        assert!(no.is_no_access());
        assert!(!no.is_mult_access());
        assert!(mult.is_mult_access());
        assert!(!mult.is_no_access());
        assert!(!single(&["a"]).is_no_access());
    }

    #[rstest]
    #[case("$uid")]
    #[case("a")]
    #[case("_private")]
    #[case("$post_id2")]
    #[should_panic]
    #[case("")]
    #[should_panic]
    #[case("$")]
    #[should_panic]
    #[case("2fast")]
    #[should_panic]
    #[case("auth.uid")]
    #[should_panic]
    #[case("a$b")]
    fn variable_names(#[case] variable: &str) {
        assert!(validate_variable(variable));
    }

    #[test]
    fn from_expression() {
        let expression_false = Expression::new(RuleVerdict::False, vec![]);
        let expression_true = Expression::new(RuleVerdict::True, vec![]);
        let expression_single =
            Expression::new(RuleVerdict::Undefined, vec![vec!["a".into(), "b".into()]]);
        let expression_mult = Expression::new(
            RuleVerdict::Undefined,
            vec![vec!["a".into(), "b".into()], vec!["c".into()]],
        );

        assert_eq!(
            Access::from_expression(&expression_false).unwrap(),
            Access::NoAccess
        );
        assert_eq!(
            Access::from_expression(&expression_true).unwrap(),
            Access::MultAccess
        );
        assert_eq!(
            Access::from_expression(&expression_mult).unwrap(),
            Access::MultAccess
        );

        let access = Access::from_expression(&expression_single).unwrap();
        assert!(access.is_single_access());
        assert_eq!(access.variables(), ["a", "b"]);
    }

    #[test]
    fn from_expression_keeps_first_conjunction() {
        // Classifier reports single access even though there are two alternatives.
        let expression = Expression::with_access_number(
            AccessStatus::SingleAccess,
            vec![vec!["a".into(), "b".into()], vec!["c".into()]],
            Some("a == 'x'".into()),
        );

        let access = Access::from_expression(&expression).unwrap();
        assert_eq!(access.variables(), ["a", "b"]);
        assert_eq!(access.condition(), Some("a == 'x'"));
    }

    #[test]
    fn from_expression_without_conjunctions_fails() {
        let expression =
            Expression::with_access_number(AccessStatus::SingleAccess, vec![], None);

        assert_matches!(
            Access::from_expression(&expression),
            Err(AccessError::InvalidVariableList(_))
        );
    }

    #[test]
    fn from_expression_checks_path() {
        let expression =
            Expression::new(RuleVerdict::Undefined, vec![vec!["a".into(), "b".into()]]);

        let access = Access::from_expression_at(&expression, &["a", "b", "c", "d"]).unwrap();
        assert_eq!(access.variables(), ["a", "b"]);

        assert_matches!(
            Access::from_expression_at(&expression, &["a"]),
            Err(AccessError::UnknownVariableInPath(variable)) if variable == "b"
        );
    }

    #[rstest]
    #[case(Access::MultAccess, Access::MultAccess, AccessStatus::MultAccess)]
    #[case(Access::MultAccess, Access::NoAccess, AccessStatus::MultAccess)]
    #[case(Access::MultAccess, single(&["a", "b"]), AccessStatus::MultAccess)]
    #[case(Access::NoAccess, Access::NoAccess, AccessStatus::NoAccess)]
    #[case(Access::NoAccess, single(&["a", "b"]), AccessStatus::SingleAccess)]
    #[case(Access::NoAccess, Access::MultAccess, AccessStatus::MultAccess)]
    #[case(single(&["a", "b"]), Access::NoAccess, AccessStatus::SingleAccess)]
    #[case(single(&["a", "b"]), Access::MultAccess, AccessStatus::MultAccess)]
    #[case(single(&["a", "b"]), single(&["a", "c"]), AccessStatus::MultAccess)]
    #[case(single(&["a", "b"]), single(&["a", "b", "c"]), AccessStatus::SingleAccess)]
    #[case(single(&["a"]), single(&["b"]), AccessStatus::MultAccess)]
    fn combination_table(
        #[case] ancestor: Access,
        #[case] rule: Access,
        #[case] expected: AccessStatus,
    ) {
        assert_eq!(
            Access::combine_with_ancestor(&ancestor, &rule).status(),
            expected
        );
    }

    #[test]
    fn combination_keeps_variables() {
        let single1 = single(&["a", "b"]);
        let single3 = single(&["a", "b", "c"]);

        // Rule applies when the ancestor contributes nothing.
        assert_eq!(
            Access::combine_with_ancestor(&Access::NoAccess, &single1),
            single1
        );

        // Ancestor applies when the rule contributes nothing.
        assert_eq!(
            Access::combine_with_ancestor(&single1, &Access::NoAccess),
            single1
        );

        // Ancestor's variables win when the rule binds more of them.
        assert_eq!(
            Access::combine_with_ancestor(&single1, &single3).variables(),
            ["a", "b"]
        );
    }

    #[test]
    fn combination_ors_conditions() {
        let ancestor = single(&["a"]).with_condition("a == 'x'");
        let rule = single(&["a", "b"]).with_condition("b > 1");

        let result = Access::combine_with_ancestor(&ancestor, &rule);
        assert_eq!(result.variables(), ["a"]);
        assert_eq!(result.condition(), Some("(a == 'x') || (b > 1)"));

        // No condition on one side means access is unconstrained.
        let result = Access::combine_with_ancestor(&single(&["a"]), &rule);
        assert_eq!(result.condition(), None);
        let result = Access::combine_with_ancestor(&ancestor, &single(&["a"]));
        assert_eq!(result.condition(), None);
    }

    #[test]
    fn deletion_pattern() {
        let access = single(&["$uid"]);
        let pattern = access
            .to_deletion_pattern(&["rules", "users", "$uid", "profile"])
            .unwrap();

        assert_eq!(pattern.path(), "/users/#WIPEOUT_UID/profile");
        assert_eq!(pattern.condition(), None);
    }

    #[test]
    fn deletion_pattern_rewrites_condition() {
        let config = WipeoutConfig::default().with_placeholder("UID");
        let access = single(&["$uid"])
            .with_condition("$uid == data.child('owner').val() && $uid_alias != $uid");

        let pattern = access
            .to_deletion_pattern_with(&["rules", "users", "$uid"], &config)
            .unwrap();

        assert_eq!(pattern.path(), "/users/UID");
        assert_eq!(
            pattern.condition(),
            Some("UID == data.child('owner').val() && $uid_alias != UID")
        );
    }

    #[test]
    fn deletion_pattern_errors() {
        let access = single(&["$uid"]);

        assert_matches!(
            access.to_deletion_pattern(&["users", "$uid"]),
            Err(AccessError::InvalidPath(_))
        );
        assert_matches!(
            access.to_deletion_pattern::<&str>(&[]),
            Err(AccessError::InvalidPath(_))
        );
        assert_matches!(
            access.to_deletion_pattern(&["rules", "users", "$user"]),
            Err(AccessError::UnknownVariableInPath(_))
        );
        assert_matches!(
            Access::MultAccess.to_deletion_pattern(&["rules", "users"]),
            Err(AccessError::NotSingleAccess(AccessStatus::MultAccess))
        );
    }

    #[test]
    fn deserialize_validates_grant() {
        let access: Access = serde_json::from_str(
            r#"{ "status": "single_access", "variables": ["$uid"], "condition": "x" }"#,
        )
        .unwrap();
        assert_eq!(access, single(&["$uid"]).with_condition("x"));

        let access: Access = serde_json::from_str(r#"{ "status": "mult_access" }"#).unwrap();
        assert_eq!(access, Access::MultAccess);

        assert!(
            serde_json::from_str::<Access>(r#"{ "status": "single_access", "variables": [] }"#)
                .is_err()
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(AccessStatus::try_from(0u8).unwrap(), AccessStatus::NoAccess);
        assert_eq!(AccessStatus::try_from(1u8).unwrap(), AccessStatus::SingleAccess);
        assert_eq!(AccessStatus::try_from(2u8).unwrap(), AccessStatus::MultAccess);
        assert_eq!(
            "SINGLE_ACCESS".parse::<AccessStatus>().unwrap(),
            AccessStatus::SingleAccess
        );
        assert_eq!(AccessStatus::MultAccess.to_string(), "multiple");
    }
}
