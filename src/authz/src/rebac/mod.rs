//! Relationship-based authorization (ReBAC)
//!
//! The [`RebacAdapter`] contract is consumed by the hybrid engine. Production
//! deployments plug in an external relationship store; [`InMemoryRebacAdapter`]
//! covers tests and local development.

pub mod adapter;
pub mod memory;
pub mod types;

pub use adapter::RebacAdapter;
pub use memory::InMemoryRebacAdapter;
pub use types::{
    RebacCallOptions, RebacCheckInput, RebacCheckResult, RebacListObjectsInput,
    RebacListObjectsResult, RebacListSubjectsInput, RebacListSubjectsResult, RelationshipObject,
    RelationshipSubject, RelationshipTuple,
};
