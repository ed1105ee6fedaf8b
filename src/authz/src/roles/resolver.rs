//! Role permission compilation and per-role indexes

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::compiler::ir::RuleParts;
use crate::compiler::CompiledRule;
use crate::engine::index::{sort_candidates, RuleIndex, ALL_SCOPES};
use crate::policy::{Effect, RoleDefinition, TenantScope};

/// Synthesized rule id for a role permission
pub fn role_rule_id(role: &str, ordinal: usize) -> String {
    format!("role:{}:{}", role, ordinal)
}

/// Compile a role's permissions into allow rules (priority 0, tenant scope)
pub fn compile_role_permissions(role: &RoleDefinition) -> Vec<CompiledRule> {
    role.permissions
        .iter()
        .enumerate()
        .map(|(ordinal, permission)| {
            let (rule, _) = CompiledRule::compile(RuleParts {
                id: role_rule_id(&role.name, ordinal),
                effect: Effect::Allow,
                priority: 0,
                tenant_scope: TenantScope::Tenant,
                actions: &permission.actions,
                resource_types: &permission.resource_types,
                fields: permission.fields.as_ref(),
                condition: permission.when.as_ref(),
                obligations: &[],
            });
            rule
        })
        .collect()
}

/// One rule index per role name
#[derive(Debug, Clone, Default)]
pub struct RoleIndexes {
    indexes: HashMap<String, RuleIndex>,
}

impl RoleIndexes {
    pub fn get(&self, role: &str) -> Option<&RuleIndex> {
        self.indexes.get(role)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Allow candidates contributed by the given (already expanded) roles
    pub fn lookup(
        &self,
        roles: &[String],
        action: &str,
        resource_type: &str,
    ) -> Vec<&CompiledRule> {
        let mut candidates: Vec<&CompiledRule> = roles
            .iter()
            .filter_map(|role| self.indexes.get(role))
            .flat_map(|index| index.lookup(action, resource_type, &ALL_SCOPES))
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }
}

/// Build a rule index for every role; later duplicates replace earlier ones
pub fn build_role_rule_indexes(roles: &[RoleDefinition]) -> RoleIndexes {
    let mut indexes = HashMap::with_capacity(roles.len());

    for role in roles {
        let rules: Arc<[CompiledRule]> = Arc::from(compile_role_permissions(role));
        debug!(role = %role.name, permissions = rules.len(), "Indexed role permissions");
        indexes.insert(role.name.clone(), RuleIndex::build(rules));
    }

    RoleIndexes { indexes }
}
