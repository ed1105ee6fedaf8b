//! # ACX Core
//!
//! Shared request/decision model, error taxonomy and engine contract used by
//! the policy compiler, the embedded engine and the hybrid engine.

pub mod capabilities;
pub mod clock;
pub mod engine;
pub mod error;
pub mod tenant;
pub mod types;

// Re-export commonly used types
pub use capabilities::{unsupported, Capability, CapabilitySet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::AuthorizationEngine;
pub use error::{AcxError, ErrorCode, Result};
pub use tenant::{assert_tenant, create_trace_id, normalize_fields, TenantRequirement};
pub use types::{
    Action, AuthorizationInput, AuthorizationOptions, Context, Decision, DecisionMeta,
    DecisionTrace, EnginePart, ExplainResult, Obligation, Principal, PrincipalType, Reason,
    Resource, ResourceParent, TenancyMode, TenantId, TraceEvent, TraceEventType,
};
