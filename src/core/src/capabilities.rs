//! Optional engine capabilities

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AcxError, Result};

/// Capability flag identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ListObjects,
    ListSubjects,
    FilterQuery,
    Explain,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ListObjects => "listObjects",
            Capability::ListSubjects => "listSubjects",
            Capability::FilterQuery => "filterQuery",
            Capability::Explain => "explain",
        }
    }
}

/// Set of capabilities an engine supports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Fails with an engine error when the capability is not supported
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.has(capability) {
            return Ok(());
        }

        Err(unsupported(capability))
    }
}

/// Engine error for a capability the callee does not implement
pub fn unsupported(capability: Capability) -> AcxError {
    AcxError::engine(format!(
        "Engine capability not supported: {}",
        capability.as_str()
    ))
    .with_details(serde_json::json!({ "capability": capability.as_str() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_capability_checks() {
        let caps = CapabilitySet::new().with(Capability::Explain);

        assert!(caps.has(Capability::Explain));
        assert!(!caps.has(Capability::ListObjects));
        assert!(caps.require(Capability::Explain).is_ok());

        let err = caps.require(Capability::ListObjects).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Engine);
        assert_eq!(err.to_string(), "Engine capability not supported: listObjects");
    }
}
