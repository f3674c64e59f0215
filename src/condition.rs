// SPDX-License-Identifier: MIT OR Apache-2.0

//! Residual conditions are kept as opaque rule source text. Absence of a condition means access
//! is not constrained any further.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Logical OR of two residual conditions.
///
/// An absent condition is unconstrained and absorbs the other side.
pub fn or_conditions(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Some(a.to_owned()),
        (Some(a), Some(b)) => Some(format!("({}) || ({})", a, b)),
        _ => None,
    }
}

/// Replace every whole identifier in `condition` which is one of `variables` with `placeholder`.
///
/// Identifiers which only contain a variable name, like `$uid_alias` for `$uid`, are left
/// untouched. So are member accesses like the `uid` in `auth.uid`.
pub fn substitute_identifiers(condition: &str, variables: &[String], placeholder: &str) -> String {
    static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new(r"(\.?)([A-Za-z0-9_$]+)").unwrap()
    });

    IDENTIFIER_REGEX
        .replace_all(condition, |captures: &Captures| {
            let member_access = !captures[1].is_empty();
            let identifier = &captures[2];
            if !member_access && variables.iter().any(|variable| variable == identifier) {
                placeholder.to_owned()
            } else {
                captures[0].to_owned()
            }
        })
        .into_owned()
}
