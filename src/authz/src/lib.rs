//! # ACX Authorization
//!
//! Policy-based authorization: a declarative policy document is compiled into
//! an indexed IR, and requests are answered by a deny-overrides-allow engine.
//!
//! ## Features
//!
//! - **Policy compiler** with field selectors, priority ordering and
//!   conflict/unreachable-rule diagnostics
//! - **Embedded engine** with role inheritance, tenant scoping, field
//!   obligations, explain traces and a TTL decision cache
//! - **Hybrid engine** combining rule decisions with relationship checks
//!   (ReBAC) under AND semantics
//! - **Constraint validation** for role assignment
//!
//! ## Example
//!
//! ```rust
//! use acx_authz::{
//!     compile, CompileOptions, EmbeddedEngine, EngineConfig, PolicyDocument, PolicyRule,
//! };
//! use acx_core::{
//!     Action, AuthorizationEngine, AuthorizationInput, AuthorizationOptions, Principal, Resource,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = PolicyDocument::builder("2024-01")
//!         .rule(PolicyRule::allow("read-docs", ["doc:read"], ["doc"]))
//!         .build()?;
//!     let ir = compile(&document, &CompileOptions::default())?.into_result()?;
//!
//!     let engine = EmbeddedEngine::with_policy(EngineConfig::default(), ir);
//!     let input = AuthorizationInput::new(
//!         Principal::user("alice"),
//!         Resource::new("doc").with_id("d1"),
//!         Action::new("doc:read"),
//!     );
//!
//!     let decision = engine.authorize(&input, &AuthorizationOptions::default()).await?;
//!     assert!(decision.allow);
//!
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod constraints;
pub mod engine;
pub mod hybrid;
pub mod policy;
pub mod rebac;
pub mod roles;

// Re-export commonly used types
pub use acx_core::{AcxError, ErrorCode, Result};
pub use compiler::{compile, CompileOptions, CompileOutput, Diagnostic, DiagnosticLevel, PolicyIr};
pub use constraints::{validate_role_assignment, ConstraintReport, RoleAssignment, RoleDirectory};
pub use engine::{CacheConfig, EmbeddedEngine, EngineConfig, EngineMetrics, FieldViolation};
pub use hybrid::{HybridConfig, HybridEngine};
pub use policy::{
    Condition, Effect, FieldSelection, Operand, PolicyConstraints, PolicyDocument, PolicyRule,
    RoleDefinition, RolePermission, TenantScope,
};
pub use rebac::{InMemoryRebacAdapter, RebacAdapter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
