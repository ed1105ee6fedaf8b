//! Stable content hashing
//!
//! Values are encoded as JSON with object keys sorted at every level, then
//! hashed with BLAKE3. Policy documents are normalized first so that list
//! order without meaning (actions, resource types, selectors, inherits,
//! rule and role order) does not change the hash, and defaulted fields
//! (`priority`, `tenantScope`, empty field selections) hash the same whether
//! written out or omitted.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use acx_core::{AcxError, Result};

use crate::policy::{FieldSelection, PolicyConstraints, PolicyDocument};

/// JSON text with keys sorted recursively
pub fn stable_stringify(value: &Value) -> String {
    sort_value(value).to_string()
}

/// Hex BLAKE3 digest of the stable encoding
pub fn hash_value(value: &Value) -> String {
    hex::encode(blake3::hash(stable_stringify(value).as_bytes()).as_bytes())
}

/// Raw digest, used for cache keys
pub fn digest_value(value: &Value) -> [u8; 32] {
    *blake3::hash(stable_stringify(value).as_bytes()).as_bytes()
}

/// Content hash of a policy document after normalization
pub fn policy_hash(document: &PolicyDocument) -> Result<String> {
    let normalized = normalize_document(document);
    let value = serde_json::to_value(&normalized)
        .map_err(|e| AcxError::engine(format!("Failed to encode policy for hashing: {}", e)))?;
    Ok(hash_value(&value))
}

/// Canonical form of a document
///
/// Rules are ordered by id and roles by name. Pattern lists are deduplicated
/// and sorted. Role permission order is kept because it determines the
/// synthesized rule ids.
pub fn normalize_document(document: &PolicyDocument) -> PolicyDocument {
    let mut normalized = document.clone();

    for rule in &mut normalized.rules {
        rule.actions = sorted_unique(&rule.actions);
        rule.resource_types = sorted_unique(&rule.resource_types);
        rule.fields = rule.fields.as_ref().and_then(normalize_fields);
        rule.priority = Some(rule.priority.unwrap_or(0));
        rule.tenant_scope = Some(rule.tenant_scope.unwrap_or_default());
    }
    normalized.rules.sort_by(|a, b| a.id.cmp(&b.id));

    for role in &mut normalized.roles {
        role.inherits = sorted_unique(&role.inherits);
        for permission in &mut role.permissions {
            permission.actions = sorted_unique(&permission.actions);
            permission.resource_types = sorted_unique(&permission.resource_types);
            permission.fields = permission.fields.as_ref().and_then(normalize_fields);
        }
    }
    normalized.roles.sort_by(|a, b| a.name.cmp(&b.name));

    normalized.constraints = normalized.constraints.as_ref().map(normalize_constraints);

    normalized
}

/// Empty selections collapse to `None`
fn normalize_fields(fields: &FieldSelection) -> Option<FieldSelection> {
    if fields.allow.is_empty() && fields.deny.is_empty() {
        return None;
    }

    Some(FieldSelection {
        allow: sorted_unique(&fields.allow),
        deny: sorted_unique(&fields.deny),
    })
}

fn normalize_constraints(constraints: &PolicyConstraints) -> PolicyConstraints {
    let mut exclusive: Vec<Vec<String>> = constraints
        .mutually_exclusive_roles
        .iter()
        .map(|set| sorted_unique(set))
        .collect();
    exclusive.sort();
    exclusive.dedup();

    PolicyConstraints {
        mutually_exclusive_roles: exclusive,
        max_role_holders: constraints.max_role_holders.clone(),
        prerequisite_roles: constraints
            .prerequisite_roles
            .iter()
            .map(|(role, required)| (role.clone(), sorted_unique(required)))
            .collect(),
    }
}

fn sorted_unique(values: &[String]) -> Vec<String> {
    values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_value(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}
