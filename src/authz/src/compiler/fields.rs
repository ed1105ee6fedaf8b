//! Field selector compilation
//!
//! Grammar: `*` matches every field, `name` matches exactly, `prefix.*`
//! matches any field starting with `prefix.`. Any other use of `*` is
//! reported and the selector is dropped from the active matcher.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::policy::FieldSelection;

pub const INVALID_FIELD_SELECTOR: &str = "INVALID_FIELD_SELECTOR";

/// Reasons a selector is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Invalid field selector prefix.")]
    InvalidPrefix,

    #[error("Invalid field selector syntax.")]
    InvalidSyntax,
}

/// Parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPattern {
    All,
    Exact(String),
    /// Stored with the trailing dot, e.g. `profile.`
    Prefix(String),
}

pub fn parse_selector(selector: &str) -> Result<SelectorPattern, SelectorError> {
    if selector == "*" {
        return Ok(SelectorPattern::All);
    }

    let Some(star) = selector.find('*') else {
        return Ok(SelectorPattern::Exact(selector.to_string()));
    };

    if selector.ends_with(".*") && star == selector.len() - 1 {
        let prefix = &selector[..selector.len() - 1];
        if prefix.is_empty() || prefix == "." {
            return Err(SelectorError::InvalidPrefix);
        }
        return Ok(SelectorPattern::Prefix(prefix.to_string()));
    }

    Err(SelectorError::InvalidSyntax)
}

/// Matcher over a set of valid selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelectorMatcher {
    selectors: Vec<String>,
    all: bool,
    exact: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl FieldSelectorMatcher {
    fn from_patterns(selectors: Vec<String>, patterns: Vec<SelectorPattern>) -> Self {
        let mut matcher = Self {
            selectors,
            all: false,
            exact: BTreeSet::new(),
            prefixes: Vec::new(),
        };

        for pattern in patterns {
            match pattern {
                SelectorPattern::All => matcher.all = true,
                SelectorPattern::Exact(name) => {
                    matcher.exact.insert(name);
                }
                SelectorPattern::Prefix(prefix) => matcher.prefixes.push(prefix),
            }
        }

        matcher
    }

    /// Match-all first, then exact names, then prefixes
    pub fn matches(&self, field: &str) -> bool {
        if self.all {
            return true;
        }

        if self.exact.contains(field) {
            return true;
        }

        self.prefixes.iter().any(|p| field.starts_with(p.as_str()))
    }

    /// Valid selectors, deduplicated and sorted
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }
}

/// Allow and deny matchers for one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFieldSelectors {
    pub allow: Option<FieldSelectorMatcher>,
    pub deny: Option<FieldSelectorMatcher>,
}

impl CompiledFieldSelectors {
    pub fn is_empty(&self) -> bool {
        self.allow.is_none() && self.deny.is_none()
    }

    pub fn allow_list(&self) -> &[String] {
        self.allow.as_ref().map(|m| m.selectors()).unwrap_or(&[])
    }

    pub fn deny_list(&self) -> &[String] {
        self.deny.as_ref().map(|m| m.selectors()).unwrap_or(&[])
    }

    /// Requested fields excluded by these selectors, sorted
    ///
    /// A field is excluded when a deny selector matches it, or when an allow
    /// list exists and does not match it.
    pub fn excluded_fields(&self, fields: &[String]) -> Vec<String> {
        let mut excluded = BTreeSet::new();

        for field in fields {
            let denied = self.deny.as_ref().is_some_and(|m| m.matches(field));
            let not_allowed = self.allow.as_ref().is_some_and(|m| !m.matches(field));
            if denied || not_allowed {
                excluded.insert(field.clone());
            }
        }

        excluded.into_iter().collect()
    }
}

/// Rejected selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelectorDiagnostic {
    pub code: &'static str,
    pub message: String,
    pub selector: String,
}

/// Compile a rule's field selection into matchers plus diagnostics
pub fn compile_field_selectors(
    fields: Option<&FieldSelection>,
) -> (CompiledFieldSelectors, Vec<FieldSelectorDiagnostic>) {
    let mut diagnostics = Vec::new();

    let compiled = match fields {
        Some(selection) => CompiledFieldSelectors {
            allow: compile_selector_list(&selection.allow, &mut diagnostics),
            deny: compile_selector_list(&selection.deny, &mut diagnostics),
        },
        None => CompiledFieldSelectors::default(),
    };

    (compiled, diagnostics)
}

fn compile_selector_list(
    selectors: &[String],
    diagnostics: &mut Vec<FieldSelectorDiagnostic>,
) -> Option<FieldSelectorMatcher> {
    let normalized: BTreeSet<&String> = selectors.iter().collect();

    let mut valid = Vec::new();
    let mut patterns = Vec::new();

    for selector in normalized {
        match parse_selector(selector) {
            Ok(pattern) => {
                valid.push(selector.clone());
                patterns.push(pattern);
            }
            Err(err) => diagnostics.push(FieldSelectorDiagnostic {
                code: INVALID_FIELD_SELECTOR,
                message: err.to_string(),
                selector: selector.clone(),
            }),
        }
    }

    if patterns.is_empty() {
        return None;
    }

    Some(FieldSelectorMatcher::from_patterns(valid, patterns))
}
