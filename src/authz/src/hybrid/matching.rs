//! Which (resource type, action) pairs require a relationship check

use std::collections::{BTreeMap, BTreeSet};

/// Action patterns keyed by resource type; `"*"` on either axis matches anything
pub type RebacEnabledActions = BTreeMap<String, Vec<String>>;

/// Exact match, `*`, or a trailing-`*` prefix
///
/// A `*` anywhere but the end is taken literally.
pub fn matches_action_pattern(action: &str, pattern: &str) -> bool {
    match pattern {
        "*" => true,
        _ => match pattern.strip_suffix('*') {
            Some(prefix) => action.starts_with(prefix),
            None => action == pattern,
        },
    }
}

/// Patterns for `resource_type` merged with the `"*"` fallback entry
pub fn action_patterns_for<'a>(
    config: &'a RebacEnabledActions,
    resource_type: &str,
) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    config
        .get(resource_type)
        .into_iter()
        .chain(config.get("*"))
        .flatten()
        .map(String::as_str)
        .filter(|pattern| seen.insert(*pattern))
        .collect()
}

pub fn is_rebac_enabled_for(
    config: &RebacEnabledActions,
    resource_type: &str,
    action: &str,
) -> bool {
    action_patterns_for(config, resource_type)
        .into_iter()
        .any(|pattern| matches_action_pattern(action, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, &[&str])]) -> RebacEnabledActions {
        entries
            .iter()
            .map(|(rt, actions)| (rt.to_string(), actions.iter().map(|a| a.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_action_patterns() {
        assert!(matches_action_pattern("doc:read", "doc:read"));
        assert!(matches_action_pattern("doc:read", "*"));
        assert!(matches_action_pattern("doc:read", "doc:*"));
        assert!(!matches_action_pattern("file:read", "doc:*"));
        assert!(!matches_action_pattern("doc:read", "d*c:read"));
        assert!(matches_action_pattern("d*c:read", "d*c:read"));
    }

    #[test]
    fn test_resource_type_fallback() {
        let config = config(&[("doc", &["read"]), ("*", &["share", "read"])]);

        assert_eq!(action_patterns_for(&config, "doc"), vec!["read", "share"]);
        assert_eq!(action_patterns_for(&config, "file"), vec!["share", "read"]);

        assert!(is_rebac_enabled_for(&config, "doc", "read"));
        assert!(is_rebac_enabled_for(&config, "file", "share"));
        assert!(!is_rebac_enabled_for(&config, "file", "delete"));
        assert!(!is_rebac_enabled_for(&RebacEnabledActions::new(), "doc", "read"));
    }
}
