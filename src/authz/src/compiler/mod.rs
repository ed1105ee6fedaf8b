//! Policy compiler
//!
//! Turns a [`PolicyDocument`] into a [`PolicyIr`] plus diagnostics:
//!
//! - field selectors, action and resource-type patterns are parsed once
//! - conditions are bound into predicates
//! - unconditioned opposite-effect rules covering the same space are rejected
//!   (`CONFLICTING_RULES`)
//! - rules shadowed by a higher-priority twin are flagged (`UNREACHABLE_RULE`)
//! - the normalized document is hashed
//!
//! Semantic problems never fail compilation; they are reported as
//! [`Diagnostic`]s and [`CompileOutput::into_result`] turns error-level ones
//! into [`AcxError::InvalidPolicy`].

pub mod condition;
pub mod diagnostics;
pub mod fields;
pub mod hash;
pub mod ir;
pub mod matchers;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use acx_core::{AcxError, Result, TenancyMode};

pub use condition::{evaluate, ConditionInput};
pub use diagnostics::{Diagnostic, DiagnosticLevel};
pub use fields::{compile_field_selectors, CompiledFieldSelectors, FieldSelectorMatcher};
pub use hash::{hash_value, policy_hash, stable_stringify};
pub use ir::{CompiledRule, PolicyIr, Predicate};
pub use matchers::{ActionMatcher, ResourceTypeMatcher};

use crate::policy::{PolicyDocument, TenantScope};
use crate::roles::{role_rule_id, RoleGraph};
use ir::RuleParts;
use matchers::any_overlap;

/// Compiler options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub mode: TenancyMode,
}

impl CompileOptions {
    pub fn multi_tenant() -> Self {
        Self {
            mode: TenancyMode::MultiTenant,
        }
    }
}

/// IR plus everything the compiler found along the way
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub ir: PolicyIr,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Fail with `InvalidPolicy` when any error-level diagnostic is present
    pub fn into_result(self) -> Result<PolicyIr> {
        if !self.has_errors() {
            return Ok(self.ir);
        }

        let errors: Vec<&Diagnostic> = self.errors().collect();
        let message = format!(
            "Policy {} failed compilation with {} error(s).",
            self.ir.policy_version,
            errors.len()
        );
        let details = serde_json::to_value(&errors).unwrap_or_else(|_| json!([]));

        Err(AcxError::invalid_policy(message).with_details(json!({ "diagnostics": details })))
    }
}

/// Compile a policy document
pub fn compile(document: &PolicyDocument, options: &CompileOptions) -> Result<CompileOutput> {
    let mut diagnostics = Vec::new();
    let mut compiled = Vec::with_capacity(document.rules.len());
    let mut seen_ids = HashSet::new();

    for rule in &document.rules {
        if !seen_ids.insert(rule.id.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    diagnostics::DUPLICATE_RULE_ID,
                    format!("Rule id {} is defined more than once.", rule.id),
                )
                .for_rule(&rule.id),
            );
        }

        if options.mode == TenancyMode::MultiTenant && rule.tenant_scope.is_none() {
            diagnostics.push(
                Diagnostic::warning(
                    diagnostics::MISSING_TENANT_SCOPE,
                    "Rule is missing tenantScope in multi-tenant mode.",
                )
                .for_rule(&rule.id),
            );
        }

        let (compiled_rule, field_diagnostics) = CompiledRule::compile(RuleParts {
            id: rule.id.clone(),
            effect: rule.effect,
            priority: rule.priority.unwrap_or(0),
            tenant_scope: rule.tenant_scope.unwrap_or_default(),
            actions: &rule.actions,
            resource_types: &rule.resource_types,
            fields: rule.fields.as_ref(),
            condition: rule.when.as_ref(),
            obligations: &rule.obligations,
        });

        diagnostics.extend(field_diagnostics.into_iter().map(|d| {
            Diagnostic::error(d.code, format!("{} ({})", d.message, d.selector)).for_rule(&rule.id)
        }));

        compiled.push(compiled_rule);
    }

    diagnostics.extend(detect_conflicts(&compiled));
    diagnostics.extend(detect_unreachable(&compiled));
    diagnostics.extend(check_roles(document));

    let ir = PolicyIr {
        policy_version: document.policy_version.clone(),
        policy_hash: policy_hash(document)?,
        compiled_rules: Arc::from(compiled),
        roles: document.roles.clone(),
        constraints: document.constraints.clone(),
    };

    for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
        warn!(
            code = %diagnostic.code,
            rule_id = ?diagnostic.rule_id,
            "{}",
            diagnostic.message
        );
    }

    info!(
        policy_version = %ir.policy_version,
        policy_hash = %ir.policy_hash,
        rules = ir.compiled_rules.len(),
        roles = ir.roles.len(),
        diagnostics = diagnostics.len(),
        "Compiled policy"
    );

    Ok(CompileOutput { ir, diagnostics })
}

/// Whether two rules can both match some (action, resource type) pair
fn coverage_overlaps(a: &CompiledRule, b: &CompiledRule) -> bool {
    any_overlap(&a.action_matchers, &b.action_matchers, ActionMatcher::overlaps)
        && any_overlap(
            &a.resource_type_matchers,
            &b.resource_type_matchers,
            ResourceTypeMatcher::overlaps,
        )
}

fn comparable(a: &CompiledRule, b: &CompiledRule) -> bool {
    a.tenant_scope == b.tenant_scope
        && !a.predicate.is_conditional()
        && !b.predicate.is_conditional()
        && coverage_overlaps(a, b)
}

fn detect_conflicts(rules: &[CompiledRule]) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.effect == b.effect || !comparable(a, b) {
                continue;
            }

            found.push(
                Diagnostic::error(
                    diagnostics::CONFLICTING_RULES,
                    format!("Rules {} and {} conflict without conditions.", a.id, b.id),
                )
                .for_rule(&b.id),
            );
        }
    }

    found
}

fn detect_unreachable(rules: &[CompiledRule]) -> Vec<Diagnostic> {
    let mut sorted: Vec<&CompiledRule> = rules.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut found = Vec::new();

    for (i, higher) in sorted.iter().enumerate() {
        for lower in &sorted[i + 1..] {
            if higher.priority <= lower.priority
                || higher.effect != lower.effect
                || !comparable(higher, lower)
            {
                continue;
            }

            debug!(rule_id = %lower.id, shadowed_by = %higher.id, "Unreachable rule");
            found.push(
                Diagnostic::warning(
                    diagnostics::UNREACHABLE_RULE,
                    format!("Rule {} is unreachable due to {}.", lower.id, higher.id),
                )
                .for_rule(&lower.id),
            );
        }
    }

    found
}

fn check_roles(document: &PolicyDocument) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    let mut names = BTreeSet::new();

    for role in &document.roles {
        if !names.insert(role.name.as_str()) {
            found.push(Diagnostic::error(
                diagnostics::DUPLICATE_ROLE,
                format!("Role {} is defined more than once.", role.name),
            ));
        }
    }

    for role in &document.roles {
        for (ordinal, permission) in role.permissions.iter().enumerate() {
            let (_, field_diagnostics) = compile_field_selectors(permission.fields.as_ref());
            let rule_id = role_rule_id(&role.name, ordinal);
            found.extend(field_diagnostics.into_iter().map(|d| {
                Diagnostic::error(d.code, format!("{} ({})", d.message, d.selector))
                    .for_rule(&rule_id)
            }));
        }
    }

    for role in &document.roles {
        for inherited in &role.inherits {
            if !names.contains(inherited.as_str()) {
                found.push(Diagnostic::warning(
                    diagnostics::UNKNOWN_INHERITED_ROLE,
                    format!("Role {} inherits undefined role {}.", role.name, inherited),
                ));
            }
        }
    }

    let cyclic = RoleGraph::from_roles(&document.roles).cyclic_roles();
    if !cyclic.is_empty() {
        found.push(Diagnostic::warning(
            diagnostics::CYCLIC_ROLE_INHERITANCE,
            format!("Role inheritance contains a cycle: {}.", cyclic.join(", ")),
        ));
    }

    found
}
