//! Role resolution
//!
//! Roles form a directed `inherits` graph. A principal's effective roles are
//! the transitive closure of its assigned roles; each role's permissions are
//! compiled into synthetic allow rules and indexed per role.

pub mod graph;
pub mod resolver;

pub use graph::RoleGraph;
pub use resolver::{build_role_rule_indexes, compile_role_permissions, role_rule_id, RoleIndexes};
