//! Request, decision and trace types shared by every engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tenant identifier
pub type TenantId = String;

/// Supported principal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Service,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "user",
            PrincipalType::Service => "service",
        }
    }
}

/// Principal (user or service) requesting authorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,

    #[serde(rename = "type")]
    pub principal_type: PrincipalType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Directly assigned roles (inheritance is expanded by the engine)
    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl Principal {
    pub fn new(id: impl Into<String>, principal_type: PrincipalType) -> Self {
        Self {
            id: id.into(),
            principal_type,
            tenant_id: None,
            roles: Vec::new(),
            groups: Vec::new(),
            attrs: Map::new(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, PrincipalType::User)
    }

    pub fn service(id: impl Into<String>) -> Self {
        Self::new(id, PrincipalType::Service)
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// Parent resource reference for hierarchical policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceParent {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub id: String,

    #[serde(default)]
    pub attrs: Map<String, Value>,
}

/// Resource being accessed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Concrete instance id; type-level requests leave it empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub attrs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceParent>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            attrs: Map::new(),
            parent: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: ResourceParent) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Action being performed, optionally scoped to named fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Contextual data for policy evaluation (request, time, workflow, env, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Input for a single authorization decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationInput {
    pub principal: Principal,
    pub resource: Resource,
    pub action: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl AuthorizationInput {
    pub fn new(principal: Principal, resource: Resource, action: Action) -> Self {
        Self {
            principal,
            resource,
            action,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// A reason explaining a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Reason {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Side instruction the caller must honor (e.g. omit fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    #[serde(rename = "type")]
    pub obligation_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Obligation {
    pub fn new(obligation_type: impl Into<String>) -> Self {
        Self {
            obligation_type: obligation_type.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Evaluation stage that took part in a composed decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePart {
    Embedded,
    Rebac,
}

/// Metadata about how a decision was evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMeta {
    pub trace_id: String,
    pub engine: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_hash: Option<String>,

    pub evaluated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Set by composing engines only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub engine_parts: Vec<EnginePart>,
}

/// Result of an authorization decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub allow: bool,
    pub reasons: Vec<Reason>,
    pub obligations: Vec<Obligation>,
    pub meta: DecisionMeta,
}

impl Decision {
    pub fn reason_codes(&self) -> Vec<&str> {
        self.reasons.iter().map(|r| r.code.as_str()).collect()
    }

    pub fn has_reason(&self, code: &str) -> bool {
        self.reasons.iter().any(|r| r.code == code)
    }
}

/// Category of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventType {
    Input,
    Policy,
    Rule,
    Constraint,
    Obligation,
    Info,
    Error,
}

/// A single event captured during evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: String,
    pub at: DateTime<Utc>,

    #[serde(rename = "type")]
    pub event_type: TraceEventType,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Ordered trace for explain operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTrace {
    pub trace_id: String,
    pub events: Vec<TraceEvent>,
}

/// Optional settings for authorization requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Capture an explain trace (bypasses the decision cache)
    #[serde(default)]
    pub trace: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl AuthorizationOptions {
    pub fn traced() -> Self {
        Self {
            trace: true,
            ..Default::default()
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// Decision plus its trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainResult {
    pub decision: Decision,
    pub trace: DecisionTrace,
}

/// Deployment tenancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenancyMode {
    #[default]
    SingleTenant,
    MultiTenant,
}
