//! Compiled policy representation

use std::sync::Arc;

use serde_json::Value;

use acx_core::Obligation;

use super::condition::{evaluate, ConditionInput};
use super::fields::{compile_field_selectors, CompiledFieldSelectors, FieldSelectorDiagnostic};
use super::matchers::{
    compile_action_matchers, compile_resource_type_matchers, matches_action,
    matches_resource_type, ActionMatcher, ResourceTypeMatcher,
};
use crate::policy::{
    Condition, Effect, FieldSelection, PolicyConstraints, PolicyObligation, RoleDefinition,
    TenantScope,
};

/// Condition bound to a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    When(Condition),
}

impl Predicate {
    pub fn from_condition(condition: Option<&Condition>) -> Self {
        match condition {
            Some(condition) => Predicate::When(condition.clone()),
            None => Predicate::Always,
        }
    }

    pub fn holds(&self, input: &ConditionInput) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::When(condition) => evaluate(condition, input),
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Predicate::When(_))
    }
}

/// Rule with patterns, selectors and condition pre-compiled
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub id: String,
    pub effect: Effect,
    pub priority: i64,
    pub tenant_scope: TenantScope,
    pub action_matchers: Vec<ActionMatcher>,
    pub resource_type_matchers: Vec<ResourceTypeMatcher>,
    pub field_selectors: CompiledFieldSelectors,
    pub predicate: Predicate,
    pub obligations: Vec<Obligation>,
}

/// Raw parts shared by document rules and role permissions
pub(crate) struct RuleParts<'a> {
    pub id: String,
    pub effect: Effect,
    pub priority: i64,
    pub tenant_scope: TenantScope,
    pub actions: &'a [String],
    pub resource_types: &'a [String],
    pub fields: Option<&'a FieldSelection>,
    pub condition: Option<&'a Condition>,
    pub obligations: &'a [PolicyObligation],
}

impl CompiledRule {
    pub(crate) fn compile(parts: RuleParts<'_>) -> (Self, Vec<FieldSelectorDiagnostic>) {
        let (field_selectors, diagnostics) = compile_field_selectors(parts.fields);

        let rule = Self {
            id: parts.id,
            effect: parts.effect,
            priority: parts.priority,
            tenant_scope: parts.tenant_scope,
            action_matchers: compile_action_matchers(parts.actions),
            resource_type_matchers: compile_resource_type_matchers(parts.resource_types),
            field_selectors,
            predicate: Predicate::from_condition(parts.condition),
            obligations: parts.obligations.iter().map(to_obligation).collect(),
        };

        (rule, diagnostics)
    }

    pub fn applies_to(&self, action: &str, resource_type: &str) -> bool {
        matches_action(action, &self.action_matchers)
            && matches_resource_type(resource_type, &self.resource_type_matchers)
    }

    pub fn has_field_selectors(&self) -> bool {
        !self.field_selectors.is_empty()
    }
}

fn to_obligation(obligation: &PolicyObligation) -> Obligation {
    Obligation {
        obligation_type: obligation.obligation_type.clone(),
        payload: obligation.payload.clone().map(Value::Object),
    }
}

/// Output of one compile call
///
/// Rules live in a single shared arena; indexes refer to them by position.
#[derive(Debug, Clone)]
pub struct PolicyIr {
    pub policy_version: String,
    pub policy_hash: String,
    pub compiled_rules: Arc<[CompiledRule]>,
    pub roles: Vec<RoleDefinition>,
    pub constraints: Option<PolicyConstraints>,
}

impl PolicyIr {
    pub fn rule(&self, id: &str) -> Option<&CompiledRule> {
        self.compiled_rules.iter().find(|r| r.id == id)
    }
}
