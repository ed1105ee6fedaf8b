//! Condition evaluation
//!
//! Evaluation never fails: unknown refs resolve to an absent value, ordering
//! comparisons between mismatched types are `false`, and regexes that are too
//! long or do not compile never match.

use std::borrow::Cow;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use acx_core::{AcxError, AuthorizationInput, Result};

use crate::policy::{Condition, Operand};

/// Patterns longer than this never match
pub const MAX_REGEX_LENGTH: usize = 1024;

/// Process-wide compiled pattern cache; `None` marks a pattern that failed to compile
static REGEX_CACHE: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

/// JSON view of the request that refs resolve against
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionInput {
    pub principal: Value,
    pub resource: Value,
    pub context: Option<Value>,
}

impl ConditionInput {
    /// Build the view, replacing the principal's roles with `effective_roles`
    pub fn from_request(input: &AuthorizationInput, effective_roles: &[String]) -> Result<Self> {
        let mut principal = serde_json::to_value(&input.principal)
            .map_err(|e| AcxError::engine(format!("Failed to encode principal: {}", e)))?;
        if let Value::Object(map) = &mut principal {
            map.insert(
                "roles".to_string(),
                Value::Array(effective_roles.iter().cloned().map(Value::String).collect()),
            );
        }

        let resource = serde_json::to_value(&input.resource)
            .map_err(|e| AcxError::engine(format!("Failed to encode resource: {}", e)))?;

        let context = input
            .context
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AcxError::engine(format!("Failed to encode context: {}", e)))?;

        Ok(Self {
            principal,
            resource,
            context,
        })
    }
}

/// Evaluate a condition tree
pub fn evaluate(condition: &Condition, input: &ConditionInput) -> bool {
    match condition {
        Condition::And { args } => args.iter().all(|arg| evaluate(arg, input)),
        Condition::Or { args } => args.iter().any(|arg| evaluate(arg, input)),
        Condition::Not { arg } => !evaluate(arg, input),
        Condition::Eq { left, right } => {
            values_equal(resolve(left, input).as_deref(), resolve(right, input).as_deref())
        }
        Condition::Ne { left, right } => {
            !values_equal(resolve(left, input).as_deref(), resolve(right, input).as_deref())
        }
        Condition::Gt { left, right } => compare(left, right, input, |o| o.is_gt()),
        Condition::Gte { left, right } => compare(left, right, input, |o| o.is_ge()),
        Condition::Lt { left, right } => compare(left, right, input, |o| o.is_lt()),
        Condition::Lte { left, right } => compare(left, right, input, |o| o.is_le()),
        Condition::In { item, set } => {
            in_set(resolve(item, input).as_deref(), resolve(set, input).as_deref())
        }
        Condition::Contains { text, value } => {
            contains(resolve(text, input).as_deref(), resolve(value, input).as_deref())
        }
        Condition::Matches { text, regex } => matches_regex(resolve(text, input).as_deref(), regex),
    }
}

/// Resolve an operand; `None` is the absent value
///
/// Absent elements of a list operand are dropped.
pub fn resolve<'a>(operand: &'a Operand, input: &'a ConditionInput) -> Option<Cow<'a, Value>> {
    match operand {
        Operand::Ref(reference) => resolve_ref(&reference.path, input).map(Cow::Borrowed),
        Operand::List(items) => Some(Cow::Owned(Value::Array(
            items
                .iter()
                .filter_map(|item| resolve(item, input))
                .map(Cow::into_owned)
                .collect(),
        ))),
        Operand::Literal(value) => Some(Cow::Borrowed(value)),
    }
}

/// Walk a dot path rooted at `principal`, `resource` or `context`
pub fn resolve_ref<'a>(path: &str, input: &'a ConditionInput) -> Option<&'a Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());

    let mut current = match segments.next()? {
        "principal" => &input.principal,
        "resource" => &input.resource,
        "context" => input.context.as_ref()?,
        _ => return None,
    };

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Absent equals only absent
fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(a), Some(b)) => deep_equal(a, b),
        _ => false,
    }
}

/// Structural equality; numbers compare by value, objects by key set
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| deep_equal(value, other)))
        }
        _ => left == right,
    }
}

fn compare(
    left: &Operand,
    right: &Operand,
    input: &ConditionInput,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    let (Some(left), Some(right)) = (resolve(left, input), resolve(right, input)) else {
        return false;
    };

    let ordering = match (&*left, &*right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    ordering.is_some_and(accept)
}

fn in_set(item: Option<&Value>, set: Option<&Value>) -> bool {
    match (item, set) {
        (Some(item), Some(Value::Array(entries))) => entries.iter().any(|e| deep_equal(e, item)),
        _ => false,
    }
}

fn contains(text: Option<&Value>, value: Option<&Value>) -> bool {
    match (text, value) {
        (Some(Value::String(haystack)), Some(Value::String(needle))) => {
            haystack.contains(needle.as_str())
        }
        (Some(Value::Array(entries)), Some(value)) => entries.iter().any(|e| deep_equal(e, value)),
        _ => false,
    }
}

fn matches_regex(text: Option<&Value>, pattern: &str) -> bool {
    let Some(Value::String(text)) = text else {
        return false;
    };

    if pattern.chars().count() > MAX_REGEX_LENGTH {
        return false;
    }

    if let Some(cached) = REGEX_CACHE.get(pattern) {
        return cached.as_ref().is_some_and(|re| re.is_match(text));
    }

    let compiled = match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(
                pattern = %pattern,
                error = %err,
                "Regex pattern failed to compile; treating as non-matching"
            );
            None
        }
    };
    let matched = compiled.as_ref().is_some_and(|re| re.is_match(text));
    REGEX_CACHE.insert(pattern.to_string(), compiled);

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use acx_core::{Action, Context, Principal, Resource};
    use serde_json::json;

    fn input() -> ConditionInput {
        let request = AuthorizationInput::new(
            Principal::user("alice")
                .with_tenant("t1")
                .with_role("editor")
                .with_attribute("department", "eng")
                .with_attribute("level", 5)
                .with_attribute("tags", json!(["a", "b"])),
            Resource::new("doc")
                .with_id("d1")
                .with_attribute("path", "/public/readme")
                .with_attribute("owner", json!({ "id": "alice", "team": "core" })),
            Action::new("read"),
        )
        .with_context(Context::new().with_value("env", "prod").with_value("hour", 14));

        ConditionInput::from_request(&request, &["editor".to_string(), "viewer".to_string()])
            .unwrap()
    }

    fn r(path: &str) -> Operand {
        Operand::reference(path)
    }

    #[test]
    fn test_resolve_paths() {
        let input = input();
        assert_eq!(resolve_ref("principal.id", &input), Some(&json!("alice")));
        assert_eq!(resolve_ref("principal.attrs.department", &input), Some(&json!("eng")));
        assert_eq!(resolve_ref("resource.attrs.owner.team", &input), Some(&json!("core")));
        assert_eq!(resolve_ref("principal.roles.1", &input), Some(&json!("viewer")));
        assert_eq!(resolve_ref("context.env", &input), Some(&json!("prod")));
        assert_eq!(resolve_ref("principal.attrs.missing.deeper", &input), None);
        assert_eq!(resolve_ref("session.id", &input), None);
        assert_eq!(resolve_ref("", &input), None);
    }

    #[test]
    fn test_equality() {
        let input = input();
        assert!(evaluate(&Condition::eq(r("principal.attrs.department"), "eng"), &input));
        assert!(evaluate(&Condition::ne(r("principal.attrs.department"), "ops"), &input));
        assert!(evaluate(&Condition::eq(r("principal.attrs.level"), 5.0), &input));
        assert!(evaluate(
            &Condition::eq(
                r("resource.attrs.owner"),
                json!({ "team": "core", "id": "alice" })
            ),
            &input
        ));
        assert!(!evaluate(&Condition::eq(r("principal.attrs.tags"), json!(["b", "a"])), &input));
    }

    #[test]
    fn test_absent_values() {
        let input = input();
        assert!(!evaluate(&Condition::eq(r("principal.attrs.missing"), "x"), &input));
        assert!(evaluate(&Condition::ne(r("principal.attrs.missing"), "x"), &input));
        assert!(evaluate(
            &Condition::eq(r("principal.attrs.missing"), r("context.missing")),
            &input
        ));
        assert!(!evaluate(&Condition::eq(r("principal.attrs.missing"), Value::Null), &input));
        assert!(!evaluate(
            &Condition::is_in(r("principal.attrs.missing"), vec!["a", "b"]),
            &input
        ));
        assert!(!evaluate(&Condition::gt(r("principal.attrs.missing"), 1), &input));
    }

    #[test]
    fn test_ordering() {
        let input = input();
        assert!(evaluate(&Condition::gt(r("principal.attrs.level"), 3), &input));
        assert!(evaluate(&Condition::gte(r("principal.attrs.level"), 5), &input));
        assert!(evaluate(&Condition::lt(r("context.hour"), 18), &input));
        assert!(evaluate(&Condition::lte("abc", "abd"), &input));
        assert!(!evaluate(&Condition::gt(r("principal.attrs.level"), "3"), &input));
        assert!(!evaluate(&Condition::lt(true, false), &input));
    }

    #[test]
    fn test_membership() {
        let input = input();
        assert!(evaluate(&Condition::is_in("viewer", r("principal.roles")), &input));
        assert!(evaluate(
            &Condition::is_in(r("context.env"), vec![Operand::from("dev"), Operand::from("prod")]),
            &input
        ));
        assert!(!evaluate(&Condition::is_in("x", r("context.env")), &input));
        assert!(evaluate(&Condition::contains(r("resource.attrs.path"), "public"), &input));
        assert!(evaluate(&Condition::contains(r("principal.attrs.tags"), "b"), &input));
        assert!(!evaluate(&Condition::contains(r("principal.attrs.level"), 5), &input));
    }

    #[test]
    fn test_boolean_combinators() {
        let input = input();
        let yes = Condition::eq(1, 1);
        let no = Condition::eq(1, 2);

        assert!(evaluate(&Condition::and(vec![yes.clone(), yes.clone()]), &input));
        assert!(!evaluate(&Condition::and(vec![yes.clone(), no.clone()]), &input));
        assert!(evaluate(&Condition::or(vec![no.clone(), yes.clone()]), &input));
        assert!(!evaluate(&Condition::or(vec![]), &input));
        assert!(evaluate(&Condition::and(vec![]), &input));
        assert!(evaluate(&Condition::not(no), &input));
    }

    #[test]
    fn test_regex() {
        let input = input();
        assert!(evaluate(&Condition::matches(r("resource.attrs.path"), "^/public/"), &input));
        assert!(!evaluate(&Condition::matches(r("resource.attrs.path"), "^/private/"), &input));
        assert!(!evaluate(&Condition::matches(r("principal.attrs.level"), "5"), &input));

        // Invalid patterns never match, and stay non-matching once cached
        assert!(!evaluate(&Condition::matches(r("resource.attrs.path"), "(unclosed"), &input));
        assert!(!evaluate(&Condition::matches(r("resource.attrs.path"), "(unclosed"), &input));

        let long = "a".repeat(MAX_REGEX_LENGTH + 1);
        assert!(!evaluate(&Condition::matches(long.clone(), &long), &input));
    }
}
