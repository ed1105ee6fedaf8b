//! Relationship-check adapter contract

use async_trait::async_trait;

use acx_core::{unsupported, Capability, CapabilitySet, Result};

use super::types::{
    RebacCallOptions, RebacCheckInput, RebacCheckResult, RebacListObjectsInput,
    RebacListObjectsResult, RebacListSubjectsInput, RebacListSubjectsResult, RelationshipTuple,
};

/// Relationship store consulted by the hybrid engine
///
/// Failures are reported as [`acx_core::AcxError::Adapter`] and propagate to
/// the caller unchanged.
#[async_trait]
pub trait RebacAdapter: Send + Sync {
    async fn write_tuples(
        &self,
        tuples: Vec<RelationshipTuple>,
        options: &RebacCallOptions,
    ) -> Result<()>;

    async fn check(
        &self,
        input: &RebacCheckInput,
        options: &RebacCallOptions,
    ) -> Result<RebacCheckResult>;

    /// Optional operations this adapter implements
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::default()
    }

    async fn list_objects(
        &self,
        _input: &RebacListObjectsInput,
        _options: &RebacCallOptions,
    ) -> Result<RebacListObjectsResult> {
        Err(unsupported(Capability::ListObjects))
    }

    async fn list_subjects(
        &self,
        _input: &RebacListSubjectsInput,
        _options: &RebacCallOptions,
    ) -> Result<RebacListSubjectsResult> {
        Err(unsupported(Capability::ListSubjects))
    }
}
