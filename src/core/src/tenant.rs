//! Tenant assertion and request normalisation helpers

use std::collections::BTreeSet;

use crate::error::{AcxError, Result};
use crate::types::{AuthorizationInput, TenancyMode};

/// Whether a tenant id must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantRequirement {
    Required,
    Optional,
}

impl From<TenancyMode> for TenantRequirement {
    fn from(mode: TenancyMode) -> Self {
        match mode {
            TenancyMode::MultiTenant => TenantRequirement::Required,
            TenancyMode::SingleTenant => TenantRequirement::Optional,
        }
    }
}

/// Resolve the tenant for a request, failing when it is required but absent.
///
/// The context tenant takes precedence over the principal's. Empty strings
/// count as absent.
pub fn assert_tenant(
    input: &AuthorizationInput,
    requirement: TenantRequirement,
) -> Result<Option<String>> {
    let tenant_id = input
        .context
        .as_ref()
        .and_then(|c| c.tenant_id.as_deref())
        .filter(|t| !t.is_empty())
        .or_else(|| input.principal.tenant_id.as_deref().filter(|t| !t.is_empty()))
        .map(str::to_string);

    if tenant_id.is_none() && requirement == TenantRequirement::Required {
        return Err(AcxError::missing_tenant());
    }

    Ok(tenant_id)
}

/// Deduplicate and sort requested field names
pub fn normalize_fields(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fresh trace id for audit and explain flows
pub fn create_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{Action, Context, Principal, Resource};

    fn input(principal_tenant: Option<&str>, context_tenant: Option<&str>) -> AuthorizationInput {
        let mut principal = Principal::user("u1");
        principal.tenant_id = principal_tenant.map(str::to_string);

        let mut input =
            AuthorizationInput::new(principal, Resource::new("doc"), Action::new("read"));
        if let Some(tenant) = context_tenant {
            input = input.with_context(Context::new().with_tenant(tenant));
        }
        input
    }

    #[test]
    fn test_context_tenant_wins() {
        let tenant =
            assert_tenant(&input(Some("p"), Some("c")), TenantRequirement::Required).unwrap();
        assert_eq!(tenant.as_deref(), Some("c"));

        let tenant = assert_tenant(&input(Some("p"), None), TenantRequirement::Required).unwrap();
        assert_eq!(tenant.as_deref(), Some("p"));
    }

    #[test]
    fn test_missing_tenant() {
        let err = assert_tenant(&input(None, None), TenantRequirement::Required).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingTenant);

        let err = assert_tenant(&input(Some(""), None), TenantRequirement::Required).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingTenant);

        let tenant = assert_tenant(&input(None, None), TenantRequirement::Optional).unwrap();
        assert!(tenant.is_none());
    }

    #[test]
    fn test_normalize_fields() {
        let fields = vec!["salary".to_string(), "name".to_string(), "salary".to_string()];
        assert_eq!(normalize_fields(&fields), vec!["name".to_string(), "salary".to_string()]);
        assert!(normalize_fields(&[]).is_empty());
    }

    #[test]
    fn test_trace_ids_are_unique() {
        assert_ne!(create_trace_id(), create_trace_id());
    }
}
