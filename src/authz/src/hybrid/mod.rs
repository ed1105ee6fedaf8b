//! Hybrid engine: embedded rules AND relationship checks
//!
//! ```text
//! input ──→ [EmbeddedEngine] ──────────────────────────┐
//!   │                                                   ├─→ allow = embedded && rebac
//!   └─→ enabled for (type, action) and resource.id? ─→ [RebacAdapter]
//! ```
//!
//! Requests not covered by the configuration, or without a concrete resource
//! id, are answered by the embedded engine alone.

pub mod matching;

pub use matching::{is_rebac_enabled_for, matches_action_pattern, RebacEnabledActions};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use acx_core::{
    AcxError, AuthorizationEngine, AuthorizationInput, AuthorizationOptions, CapabilitySet,
    Decision, EnginePart, Reason, Result,
};

use crate::rebac::{
    RebacAdapter, RebacCallOptions, RebacCheckInput, RebacCheckResult, RelationshipObject,
    RelationshipSubject,
};

pub const DEFAULT_HYBRID_ENGINE_NAME: &str = "acx-hybrid";

pub const REBAC_ALLOW: &str = "REBAC_ALLOW";
pub const REBAC_DENY: &str = "REBAC_DENY";

/// Hybrid engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridConfig {
    #[serde(default)]
    pub rebac_enabled_actions_by_resource_type: RebacEnabledActions,
}

impl HybridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a relationship check for `actions` on `resource_type`
    pub fn enable<I, S>(mut self, resource_type: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rebac_enabled_actions_by_resource_type
            .entry(resource_type.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }
}

/// Composes an embedded engine with a [`RebacAdapter`]
pub struct HybridEngine {
    embedded: Arc<dyn AuthorizationEngine>,
    rebac: Arc<dyn RebacAdapter>,
    config: HybridConfig,
    engine_name: String,
}

impl HybridEngine {
    pub fn new(
        embedded: Arc<dyn AuthorizationEngine>,
        rebac: Arc<dyn RebacAdapter>,
        config: HybridConfig,
    ) -> Self {
        Self {
            embedded,
            rebac,
            config,
            engine_name: DEFAULT_HYBRID_ENGINE_NAME.to_string(),
        }
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.engine_name = name.into();
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    fn should_run_rebac(&self, input: &AuthorizationInput) -> bool {
        input.resource.id.as_deref().is_some_and(|id| !id.is_empty())
            && is_rebac_enabled_for(
                &self.config.rebac_enabled_actions_by_resource_type,
                &input.resource.resource_type,
                &input.action.name,
            )
    }

    async fn run_rebac_check(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
    ) -> Result<RebacCheckResult> {
        let resource_id = input
            .resource
            .id
            .clone()
            .ok_or_else(|| AcxError::engine("ReBAC check requires resource.id."))?;

        let tenant_id = options
            .tenant_id
            .clone()
            .or_else(|| input.context.as_ref().and_then(|c| c.tenant_id.clone()))
            .or_else(|| input.principal.tenant_id.clone());

        let check = RebacCheckInput {
            object: RelationshipObject::new(input.resource.resource_type.clone(), resource_id),
            relation: input.action.name.clone(),
            subject: RelationshipSubject::new(
                input.principal.principal_type.as_str(),
                input.principal.id.clone(),
            ),
            tenant_id: tenant_id.clone(),
            contextual_tuples: Vec::new(),
        };
        let call_options = RebacCallOptions {
            trace_id: options.trace_id.clone(),
            tenant_id,
        };

        let result = self.rebac.check(&check, &call_options).await?;
        debug!(
            object_type = %check.object.object_type,
            object_id = %check.object.id,
            relation = %check.relation,
            allow = result.allow,
            "ReBAC check completed"
        );
        Ok(result)
    }

    fn embedded_only(&self, mut decision: Decision) -> Decision {
        decision.meta.engine = self.engine_name.clone();
        decision.meta.engine_parts = vec![EnginePart::Embedded];
        decision
    }

    fn combine(&self, mut decision: Decision, rebac: RebacCheckResult) -> Decision {
        let reason = if rebac.allow {
            Reason::new(REBAC_ALLOW, "ReBAC check allowed object access.")
        } else {
            Reason::new(REBAC_DENY, "ReBAC check denied object access.")
        };
        let reason = match rebac.trace {
            Some(trace) => reason.with_details(json!({ "trace": trace })),
            None => reason,
        };

        decision.allow = decision.allow && rebac.allow;
        decision.reasons.push(reason);
        decision.meta.engine = self.engine_name.clone();
        decision.meta.engine_parts = vec![EnginePart::Embedded, EnginePart::Rebac];
        decision
    }
}

#[async_trait]
impl AuthorizationEngine for HybridEngine {
    fn engine(&self) -> &str {
        &self.engine_name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::default()
    }

    async fn authorize(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
    ) -> Result<Decision> {
        let decision = self.embedded.authorize(input, options).await?;

        if !self.should_run_rebac(input) {
            return Ok(self.embedded_only(decision));
        }

        let rebac = self.run_rebac_check(input, options).await?;
        Ok(self.combine(decision, rebac))
    }

    async fn batch_authorize(
        &self,
        inputs: &[AuthorizationInput],
        options: &AuthorizationOptions,
    ) -> Result<Vec<Decision>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let decisions = self.embedded.batch_authorize(inputs, options).await?;
        if decisions.len() != inputs.len() {
            warn!(
                expected = inputs.len(),
                actual = decisions.len(),
                "Embedded engine returned mismatched batch size"
            );
            return Err(
                AcxError::engine("Embedded engine returned mismatched batch size.").with_details(
                    json!({ "expected": inputs.len(), "actual": decisions.len() }),
                ),
            );
        }

        let mut rebac_results = HashMap::new();
        for (index, input) in inputs.iter().enumerate() {
            if self.should_run_rebac(input) {
                rebac_results.insert(index, self.run_rebac_check(input, options).await?);
            }
        }

        Ok(decisions
            .into_iter()
            .enumerate()
            .map(|(index, decision)| match rebac_results.remove(&index) {
                Some(rebac) => self.combine(decision, rebac),
                None => self.embedded_only(decision),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config: HybridConfig = serde_json::from_value(json!({
            "rebacEnabledActionsByResourceType": { "doc": ["read", "share:*"], "*": ["admin"] }
        }))
        .unwrap();

        assert_eq!(
            config,
            HybridConfig::new()
                .enable("doc", ["read", "share:*"])
                .enable("*", ["admin"])
        );
    }

    #[test]
    fn test_config_defaults_to_empty() {
        let config: HybridConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.rebac_enabled_actions_by_resource_type.is_empty());
    }
}
