//! Action and resource-type pattern matchers

use std::collections::BTreeSet;

/// Compiled action pattern
///
/// `read` is exact; `post:*` and `*` are prefix matchers (`post:` and the
/// empty prefix respectively).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionMatcher {
    Exact(String),
    Prefix(String),
}

impl ActionMatcher {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => ActionMatcher::Prefix(prefix.to_string()),
            None => ActionMatcher::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, action: &str) -> bool {
        match self {
            ActionMatcher::Exact(value) => value == action,
            ActionMatcher::Prefix(prefix) => action.starts_with(prefix.as_str()),
        }
    }

    /// Whether some concrete action is matched by both patterns
    pub fn overlaps(&self, other: &ActionMatcher) -> bool {
        match (self, other) {
            (ActionMatcher::Exact(a), ActionMatcher::Exact(b)) => a == b,
            (ActionMatcher::Exact(a), ActionMatcher::Prefix(p))
            | (ActionMatcher::Prefix(p), ActionMatcher::Exact(a)) => a.starts_with(p.as_str()),
            (ActionMatcher::Prefix(a), ActionMatcher::Prefix(b)) => {
                a.starts_with(b.as_str()) || b.starts_with(a.as_str())
            }
        }
    }
}

/// Compiled resource-type pattern; `*` alone matches any type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceTypeMatcher {
    Exact(String),
    Any,
}

impl ResourceTypeMatcher {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            ResourceTypeMatcher::Any
        } else {
            ResourceTypeMatcher::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, resource_type: &str) -> bool {
        match self {
            ResourceTypeMatcher::Any => true,
            ResourceTypeMatcher::Exact(value) => value == resource_type,
        }
    }

    pub fn overlaps(&self, other: &ResourceTypeMatcher) -> bool {
        match (self, other) {
            (ResourceTypeMatcher::Any, _) | (_, ResourceTypeMatcher::Any) => true,
            (ResourceTypeMatcher::Exact(a), ResourceTypeMatcher::Exact(b)) => a == b,
        }
    }
}

/// Dedup, sort and parse action patterns
pub fn compile_action_matchers(actions: &[String]) -> Vec<ActionMatcher> {
    actions
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(ActionMatcher::parse)
        .collect()
}

/// Dedup, sort and parse resource-type patterns
pub fn compile_resource_type_matchers(resource_types: &[String]) -> Vec<ResourceTypeMatcher> {
    resource_types
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(ResourceTypeMatcher::parse)
        .collect()
}

pub fn matches_action(action: &str, matchers: &[ActionMatcher]) -> bool {
    matchers.iter().any(|m| m.matches(action))
}

pub fn matches_resource_type(resource_type: &str, matchers: &[ResourceTypeMatcher]) -> bool {
    matchers.iter().any(|m| m.matches(resource_type))
}

/// True when any pair drawn from `left` x `right` overlaps
pub(crate) fn any_overlap<T>(left: &[T], right: &[T], overlaps: impl Fn(&T, &T) -> bool) -> bool {
    left.iter().any(|a| right.iter().any(|b| overlaps(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_action_patterns() {
        let matchers = compile_action_matchers(&strings(&["post:*", "read", "read"]));
        assert_eq!(
            matchers,
            vec![
                ActionMatcher::Prefix("post:".into()),
                ActionMatcher::Exact("read".into())
            ]
        );

        assert!(matches_action("post:create", &matchers));
        assert!(matches_action("read", &matchers));
        assert!(!matches_action("write", &matchers));
        assert!(matches_action("anything", &[ActionMatcher::parse("*")]));
    }

    #[test]
    fn test_action_overlap() {
        let read = ActionMatcher::parse("read");
        let post_create = ActionMatcher::parse("post:create");
        let post_any = ActionMatcher::parse("post:*");
        let all = ActionMatcher::parse("*");

        assert!(read.overlaps(&read));
        assert!(!read.overlaps(&post_create));
        assert!(post_create.overlaps(&post_any));
        assert!(post_any.overlaps(&post_create));
        assert!(post_any.overlaps(&all));
        assert!(!read.overlaps(&post_any));
    }

    #[test]
    fn test_resource_type_patterns() {
        let matchers = compile_resource_type_matchers(&strings(&["doc", "*"]));
        assert_eq!(
            matchers,
            vec![ResourceTypeMatcher::Any, ResourceTypeMatcher::Exact("doc".into())]
        );
        assert!(matches_resource_type("invoice", &matchers));

        let doc = ResourceTypeMatcher::parse("doc");
        assert!(doc.overlaps(&ResourceTypeMatcher::Any));
        assert!(!doc.overlaps(&ResourceTypeMatcher::parse("invoice")));
    }
}
