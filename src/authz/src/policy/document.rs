//! Declarative policy document (rules, roles, constraints)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::condition::Condition;

/// Policy effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

/// Whether a rule applies within a tenant or across all tenants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantScope {
    #[default]
    Tenant,
    Global,
}

impl TenantScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantScope::Tenant => "tenant",
            TenantScope::Global => "global",
        }
    }
}

/// Field allow/deny patterns (`*`, `name`, `prefix.*`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

impl FieldSelection {
    pub fn new<A, D, S>(allow: A, deny: D) -> Self
    where
        A: IntoIterator<Item = S>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: allow.into_iter().map(Into::into).collect(),
            deny: deny.into_iter().map(Into::into).collect(),
        }
    }
}

/// Obligation attached to a rule and copied into matching decisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyObligation {
    #[serde(rename = "type")]
    pub obligation_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

/// A single allow or deny rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    pub id: String,
    pub effect: Effect,

    /// Exact names or trailing-wildcard patterns (`post:*`, `*`)
    pub actions: Vec<String>,
    pub resource_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSelection>,

    #[serde(default, alias = "condition", skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<PolicyObligation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_scope: Option<TenantScope>,
}

impl PolicyRule {
    pub fn new<A, R, S>(
        id: impl Into<String>,
        effect: Effect,
        actions: A,
        resource_types: R,
    ) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resource_types: resource_types.into_iter().map(Into::into).collect(),
            fields: None,
            when: None,
            obligations: Vec::new(),
            priority: None,
            tenant_scope: None,
        }
    }

    pub fn allow<A, R, S>(id: impl Into<String>, actions: A, resource_types: R) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, Effect::Allow, actions, resource_types)
    }

    pub fn deny<A, R, S>(id: impl Into<String>, actions: A, resource_types: R) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, Effect::Deny, actions, resource_types)
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_tenant_scope(mut self, scope: TenantScope) -> Self {
        self.tenant_scope = Some(scope);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }

    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_obligation(
        mut self,
        obligation_type: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        let payload = match payload {
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Some(map)
            }
            None => None,
        };
        self.obligations.push(PolicyObligation {
            obligation_type: obligation_type.into(),
            payload,
        });
        self
    }
}

/// Role permission: an implicit allow rule with priority 0 and tenant scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub actions: Vec<String>,
    pub resource_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSelection>,

    #[serde(default, alias = "condition", skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

impl RolePermission {
    pub fn new<A, R, S>(actions: A, resource_types: R) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resource_types: resource_types.into_iter().map(Into::into).collect(),
            fields: None,
            when: None,
        }
    }

    pub fn with_fields(mut self, fields: FieldSelection) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }
}

/// Named role with inherited roles and permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,

    #[serde(default)]
    pub permissions: Vec<RolePermission>,
}

impl RoleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn inherits(mut self, role: impl Into<String>) -> Self {
        self.inherits.push(role.into());
        self
    }

    pub fn permission(mut self, permission: RolePermission) -> Self {
        self.permissions.push(permission);
        self
    }
}

/// Role-assignment constraints, enforced outside authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConstraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutually_exclusive_roles: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub max_role_holders: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prerequisite_roles: BTreeMap<String, Vec<String>>,
}

/// Versioned policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub policy_version: String,
    pub rules: Vec<PolicyRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PolicyConstraints>,
}

impl PolicyDocument {
    pub fn new(policy_version: impl Into<String>, rules: Vec<PolicyRule>) -> Self {
        Self {
            policy_version: policy_version.into(),
            rules,
            roles: Vec::new(),
            constraints: None,
        }
    }

    pub fn with_roles(mut self, roles: Vec<RoleDefinition>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_constraints(mut self, constraints: PolicyConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }
}
