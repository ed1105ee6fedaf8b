//! Engine contract implemented by the embedded and hybrid engines

use async_trait::async_trait;

use crate::capabilities::{unsupported, Capability, CapabilitySet};
use crate::error::Result;
use crate::types::{AuthorizationInput, AuthorizationOptions, Decision, ExplainResult};

#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Engine name stamped into decision metadata
    fn engine(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::default()
    }

    async fn authorize(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
    ) -> Result<Decision>;

    /// Decisions in input order, observably identical to sequential `authorize` calls
    async fn batch_authorize(
        &self,
        inputs: &[AuthorizationInput],
        options: &AuthorizationOptions,
    ) -> Result<Vec<Decision>>;

    async fn explain(
        &self,
        _input: &AuthorizationInput,
        _options: &AuthorizationOptions,
    ) -> Result<ExplainResult> {
        Err(unsupported(Capability::Explain))
    }
}
