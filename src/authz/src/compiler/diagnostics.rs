//! Compile diagnostics

use serde::{Deserialize, Serialize};

pub const INVALID_FIELD_SELECTOR: &str = super::fields::INVALID_FIELD_SELECTOR;
pub const MISSING_TENANT_SCOPE: &str = "MISSING_TENANT_SCOPE";
pub const CONFLICTING_RULES: &str = "CONFLICTING_RULES";
pub const UNREACHABLE_RULE: &str = "UNREACHABLE_RULE";
pub const DUPLICATE_RULE_ID: &str = "DUPLICATE_RULE_ID";
pub const DUPLICATE_ROLE: &str = "DUPLICATE_ROLE";
pub const UNKNOWN_INHERITED_ROLE: &str = "UNKNOWN_INHERITED_ROLE";
pub const CYCLIC_ROLE_INHERITANCE: &str = "CYCLIC_ROLE_INHERITANCE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// Compiler finding; `Error` blocks using the policy, `Warning` is advisory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl Diagnostic {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            code: code.into(),
            message: message.into(),
            rule_id: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            rule_id: None,
        }
    }

    pub fn for_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}
