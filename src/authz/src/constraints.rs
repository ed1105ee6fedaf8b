//! Role-assignment constraint validation
//!
//! Checks a proposed role grant against the policy's [`PolicyConstraints`]
//! using a read-only [`RoleDirectory`]. This runs when roles are assigned,
//! never on the authorization path.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use acx_core::Result;

use crate::policy::PolicyConstraints;

pub const MUTUALLY_EXCLUSIVE_ROLE: &str = "MUTUALLY_EXCLUSIVE_ROLE";
pub const MISSING_PREREQUISITE_ROLE: &str = "MISSING_PREREQUISITE_ROLE";
pub const MAX_ROLE_HOLDERS_EXCEEDED: &str = "MAX_ROLE_HOLDERS_EXCEEDED";
pub const ROLE_DIRECTORY_ERROR: &str = "ROLE_DIRECTORY_ERROR";

/// Read-only view of current role assignments
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn list_roles(&self, user_id: &str, tenant_id: &str) -> Result<Vec<String>>;

    async fn count_role_holders(&self, role: &str, tenant_id: &str) -> Result<u64>;

    async fn has_role(&self, user_id: &str, role: &str, tenant_id: &str) -> Result<bool>;
}

/// One failed constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Outcome of [`validate_role_assignment`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub errors: Vec<ConstraintViolation>,
}

impl ConstraintReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.code.as_str()).collect()
    }
}

/// Proposed grant of `role` to `user_id` within `tenant_id`
#[derive(Debug, Clone)]
pub struct RoleAssignment<'a> {
    pub tenant_id: &'a str,
    pub user_id: &'a str,
    pub role: &'a str,
    pub constraints: Option<&'a PolicyConstraints>,
}

/// Validate a role assignment
///
/// Directory failures do not propagate; they become a single
/// `ROLE_DIRECTORY_ERROR` entry in the report.
pub async fn validate_role_assignment(
    assignment: &RoleAssignment<'_>,
    directory: &dyn RoleDirectory,
) -> ConstraintReport {
    let Some(constraints) = assignment.constraints else {
        return ConstraintReport::default();
    };

    match check_constraints(assignment, constraints, directory).await {
        Ok(errors) => ConstraintReport { errors },
        Err(err) => {
            warn!(
                user_id = %assignment.user_id,
                role = %assignment.role,
                error = %err,
                "Role directory query failed"
            );
            ConstraintReport {
                errors: vec![ConstraintViolation {
                    code: ROLE_DIRECTORY_ERROR.to_string(),
                    message: "Failed to query role directory for assignment validation."
                        .to_string(),
                    details: Some(json!({ "error": err.to_string() })),
                }],
            }
        }
    }
}

async fn check_constraints(
    assignment: &RoleAssignment<'_>,
    constraints: &PolicyConstraints,
    directory: &dyn RoleDirectory,
) -> Result<Vec<ConstraintViolation>> {
    let role = assignment.role;
    let assigned: BTreeSet<String> = directory
        .list_roles(assignment.user_id, assignment.tenant_id)
        .await?
        .into_iter()
        .collect();

    let holds_role = assigned.contains(role)
        || directory
            .has_role(assignment.user_id, role, assignment.tenant_id)
            .await?;

    let mut errors = mutually_exclusive(role, &assigned, constraints);
    errors.extend(missing_prerequisites(role, &assigned, constraints));

    if let Some(&limit) = constraints.max_role_holders.get(role) {
        if limit > 0 && !holds_role {
            let holders = directory.count_role_holders(role, assignment.tenant_id).await?;
            if holders >= limit {
                errors.push(ConstraintViolation {
                    code: MAX_ROLE_HOLDERS_EXCEEDED.to_string(),
                    message: format!("Role {} reached max holder limit ({}).", role, limit),
                    details: Some(json!({
                        "role": role,
                        "maxRoleHolders": limit,
                        "currentRoleHolders": holders,
                    })),
                });
            }
        }
    }

    Ok(errors)
}

fn mutually_exclusive(
    role: &str,
    assigned: &BTreeSet<String>,
    constraints: &PolicyConstraints,
) -> Vec<ConstraintViolation> {
    constraints
        .mutually_exclusive_roles
        .iter()
        .filter(|group| group.iter().any(|r| r == role))
        .filter_map(|group| {
            let conflicts: Vec<&String> = group
                .iter()
                .filter(|r| r.as_str() != role && assigned.contains(*r))
                .collect();
            (!conflicts.is_empty()).then(|| ConstraintViolation {
                code: MUTUALLY_EXCLUSIVE_ROLE.to_string(),
                message: format!(
                    "Role {} conflicts with existing mutually-exclusive role assignments.",
                    role
                ),
                details: Some(json!({ "role": role, "conflictingRoles": conflicts })),
            })
        })
        .collect()
}

fn missing_prerequisites(
    role: &str,
    assigned: &BTreeSet<String>,
    constraints: &PolicyConstraints,
) -> Option<ConstraintViolation> {
    let missing: Vec<&String> = constraints
        .prerequisite_roles
        .get(role)?
        .iter()
        .filter(|r| !assigned.contains(*r))
        .collect();

    (!missing.is_empty()).then(|| ConstraintViolation {
        code: MISSING_PREREQUISITE_ROLE.to_string(),
        message: format!("Role {} requires prerequisite roles before assignment.", role),
        details: Some(json!({ "role": role, "missingPrerequisites": missing })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    struct StaticDirectory {
        roles: HashMap<String, Vec<String>>,
        holders: u64,
    }

    #[async_trait]
    impl RoleDirectory for StaticDirectory {
        async fn list_roles(&self, user_id: &str, _tenant_id: &str) -> Result<Vec<String>> {
            Ok(self.roles.get(user_id).cloned().unwrap_or_default())
        }

        async fn count_role_holders(&self, _role: &str, _tenant_id: &str) -> Result<u64> {
            Ok(self.holders)
        }

        async fn has_role(&self, user_id: &str, role: &str, _tenant_id: &str) -> Result<bool> {
            Ok(self.roles.get(user_id).is_some_and(|r| r.iter().any(|x| x == role)))
        }
    }

    fn directory(user_roles: &[&str], holders: u64) -> StaticDirectory {
        StaticDirectory {
            roles: HashMap::from([(
                "u1".to_string(),
                user_roles.iter().map(|r| r.to_string()).collect(),
            )]),
            holders,
        }
    }

    fn assignment<'a>(role: &'a str, constraints: &'a PolicyConstraints) -> RoleAssignment<'a> {
        RoleAssignment {
            tenant_id: "t1",
            user_id: "u1",
            role,
            constraints: Some(constraints),
        }
    }

    #[tokio::test]
    async fn test_no_constraints_is_ok() {
        let report = validate_role_assignment(
            &RoleAssignment {
                tenant_id: "t1",
                user_id: "u1",
                role: "Admin",
                constraints: None,
            },
            &directory(&[], 0),
        )
        .await;
        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn test_mutually_exclusive() {
        let constraints = PolicyConstraints {
            mutually_exclusive_roles: vec![vec!["Auditor".into(), "Payer".into()]],
            ..Default::default()
        };

        let auditor = assignment("Auditor", &constraints);

        let report = validate_role_assignment(&auditor, &directory(&["Payer"], 0)).await;
        assert_eq!(report.codes(), vec![MUTUALLY_EXCLUSIVE_ROLE]);
        assert_eq!(
            report.errors[0].details.as_ref().unwrap()["conflictingRoles"],
            json!(["Payer"])
        );

        let report = validate_role_assignment(&auditor, &directory(&["Viewer"], 0)).await;
        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn test_missing_prerequisite() {
        let constraints = PolicyConstraints {
            prerequisite_roles: BTreeMap::from([(
                "Approver".to_string(),
                vec!["Employee".to_string(), "Trained".to_string()],
            )]),
            ..Default::default()
        };

        let approver = assignment("Approver", &constraints);

        let report = validate_role_assignment(&approver, &directory(&["Employee"], 0)).await;
        assert_eq!(report.codes(), vec![MISSING_PREREQUISITE_ROLE]);
        assert_eq!(
            report.errors[0].details.as_ref().unwrap()["missingPrerequisites"],
            json!(["Trained"])
        );
    }

    #[tokio::test]
    async fn test_max_role_holders() {
        let constraints = PolicyConstraints {
            max_role_holders: BTreeMap::from([("Owner".to_string(), 2)]),
            ..Default::default()
        };

        let owner = assignment("Owner", &constraints);

        let report = validate_role_assignment(&owner, &directory(&[], 2)).await;
        assert_eq!(report.codes(), vec![MAX_ROLE_HOLDERS_EXCEEDED]);

        let report = validate_role_assignment(&owner, &directory(&[], 1)).await;
        assert!(report.is_ok());

        // Already holding the role does not count against the limit
        let report = validate_role_assignment(&owner, &directory(&["Owner"], 5)).await;
        assert!(report.is_ok());
    }

    struct FailingDirectory;

    #[async_trait]
    impl RoleDirectory for FailingDirectory {
        async fn list_roles(&self, _user_id: &str, _tenant_id: &str) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("directory offline").into())
        }

        async fn count_role_holders(&self, _role: &str, _tenant_id: &str) -> Result<u64> {
            Ok(0)
        }

        async fn has_role(&self, _user_id: &str, _role: &str, _tenant_id: &str) -> Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let constraints = PolicyConstraints::default();
        let owner = assignment("Owner", &constraints);
        let report = validate_role_assignment(&owner, &FailingDirectory).await;

        assert_eq!(report.codes(), vec![ROLE_DIRECTORY_ERROR]);
        assert!(report.errors[0].details.as_ref().unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("directory offline"));
    }
}
