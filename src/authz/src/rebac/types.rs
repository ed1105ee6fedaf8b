//! Relationship tuple model shared by ReBAC adapters

use serde::{Deserialize, Serialize};
use serde_json::Value;

use acx_core::TenantId;

/// Object side of a relationship tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
}

impl RelationshipObject {
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
        }
    }
}

/// Subject side of a relationship tuple, optionally a userset (`group:eng#member`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipSubject {
    #[serde(rename = "type")]
    pub subject_type: String,
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl RelationshipSubject {
    pub fn new(subject_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            id: id.into(),
            relation: None,
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }
}

/// `object#relation@subject`, optionally bound to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipTuple {
    pub object: RelationshipObject,
    pub relation: String,
    pub subject: RelationshipSubject,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl RelationshipTuple {
    pub fn new(
        object: RelationshipObject,
        relation: impl Into<String>,
        subject: RelationshipSubject,
    ) -> Self {
        Self {
            object,
            relation: relation.into(),
            subject,
            tenant_id: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

/// Options shared by every adapter call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebacCallOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

/// Permission check request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebacCheckInput {
    pub object: RelationshipObject,
    pub relation: String,
    pub subject: RelationshipSubject,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Tuples considered for this check only, never persisted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contextual_tuples: Vec<RelationshipTuple>,
}

impl RebacCheckInput {
    pub fn new(
        object: RelationshipObject,
        relation: impl Into<String>,
        subject: RelationshipSubject,
    ) -> Self {
        Self {
            object,
            relation: relation.into(),
            subject,
            tenant_id: None,
            contextual_tuples: Vec::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_contextual_tuple(mut self, tuple: RelationshipTuple) -> Self {
        self.contextual_tuples.push(tuple);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebacCheckResult {
    pub allow: bool,

    /// Adapter-specific explanation, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
}

impl RebacCheckResult {
    pub fn allowed() -> Self {
        Self { allow: true, trace: None }
    }

    pub fn denied() -> Self {
        Self { allow: false, trace: None }
    }

    pub fn with_trace(mut self, trace: Value) -> Self {
        self.trace = Some(trace);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebacListObjectsInput {
    pub object_type: String,
    pub relation: String,
    pub subject: RelationshipSubject,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebacListObjectsResult {
    pub objects: Vec<RelationshipObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebacListSubjectsInput {
    pub object: RelationshipObject,
    pub relation: String,
    pub subject_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebacListSubjectsResult {
    pub subjects: Vec<RelationshipSubject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tuple_wire_format() {
        let tuple = RelationshipTuple::new(
            RelationshipObject::new("doc", "d1"),
            "viewer",
            RelationshipSubject::new("group", "eng").with_relation("member"),
        )
        .with_tenant("t1");

        assert_eq!(
            serde_json::to_value(&tuple).unwrap(),
            json!({
                "object": { "type": "doc", "id": "d1" },
                "relation": "viewer",
                "subject": { "type": "group", "id": "eng", "relation": "member" },
                "tenantId": "t1"
            })
        );
    }

    #[test]
    fn test_check_input_defaults() {
        let input: RebacCheckInput = serde_json::from_value(json!({
            "object": { "type": "doc", "id": "d1" },
            "relation": "viewer",
            "subject": { "type": "user", "id": "u1" }
        }))
        .unwrap();

        assert!(input.tenant_id.is_none());
        assert!(input.contextual_tuples.is_empty());
        assert!(input.subject.relation.is_none());
    }
}
