//! Fluent builder for policy documents

use acx_core::{AcxError, Result};

use super::document::{PolicyConstraints, PolicyDocument, PolicyRule, RoleDefinition};

/// Builder returned by [`PolicyDocument::builder`]
#[derive(Debug, Clone)]
pub struct PolicyDocumentBuilder {
    version: String,
    rules: Vec<PolicyRule>,
    roles: Vec<RoleDefinition>,
    constraints: Option<PolicyConstraints>,
}

impl PolicyDocumentBuilder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            rules: Vec::new(),
            roles: Vec::new(),
            constraints: None,
        }
    }

    pub fn rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn role(mut self, role: RoleDefinition) -> Self {
        self.roles.push(role);
        self
    }

    pub fn constraints(mut self, constraints: PolicyConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Requires a non-blank version and at least one rule
    pub fn build(self) -> Result<PolicyDocument> {
        if self.version.trim().is_empty() {
            return Err(AcxError::invalid_policy("policyVersion is required."));
        }

        if self.rules.is_empty() {
            return Err(AcxError::invalid_policy("At least one rule is required."));
        }

        Ok(PolicyDocument {
            policy_version: self.version,
            rules: self.rules,
            roles: self.roles,
            constraints: self.constraints,
        })
    }
}

impl PolicyDocument {
    pub fn builder(version: impl Into<String>) -> PolicyDocumentBuilder {
        PolicyDocumentBuilder::new(version)
    }
}
