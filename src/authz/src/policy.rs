//! Policy document model
//!
//! Documents arrive as JSON (already schema-validated by the caller) or are
//! assembled with [`PolicyDocument::builder`].

mod builder;
mod condition;
mod document;

pub use builder::PolicyDocumentBuilder;
pub use condition::{Condition, Operand, Ref};
pub use document::{
    Effect, FieldSelection, PolicyConstraints, PolicyDocument, PolicyObligation, PolicyRule,
    RoleDefinition, RolePermission, TenantScope,
};

use acx_core::{AcxError, Result};
use serde_json::Value;

impl PolicyDocument {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AcxError::invalid_policy(format!("Invalid policy document: {}", e)))
    }

    /// Parse a document from an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| AcxError::invalid_policy(format!("Invalid policy document: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| AcxError::engine(format!("Failed to encode policy document: {}", e)))
    }
}
