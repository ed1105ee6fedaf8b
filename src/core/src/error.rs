//! Error taxonomy shared by the compiler, engines and adapters
//!
//! Every error carries a stable [`ErrorCode`] so callers can branch on the
//! failure class without matching on messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcxError>;

/// Stable, wire-visible error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ACX_ERR_MISSING_TENANT")]
    MissingTenant,
    #[serde(rename = "ACX_ERR_INVALID_POLICY")]
    InvalidPolicy,
    #[serde(rename = "ACX_ERR_ENGINE")]
    Engine,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingTenant => "ACX_ERR_MISSING_TENANT",
            ErrorCode::InvalidPolicy => "ACX_ERR_INVALID_POLICY",
            ErrorCode::Engine => "ACX_ERR_ENGINE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization errors
#[derive(Debug, Error)]
pub enum AcxError {
    /// Tenant context is required but was not supplied
    #[error("{message}")]
    MissingTenant {
        message: String,
        details: Option<Value>,
    },

    /// Policy data is invalid or inconsistent
    #[error("{message}")]
    InvalidPolicy {
        message: String,
        details: Option<Value>,
    },

    /// Internal invariant violation or integration bug
    #[error("{message}")]
    Engine {
        message: String,
        details: Option<Value>,
    },

    /// Failure raised by an external collaborator (relationship adapter, role directory)
    #[error("Adapter error: {0}")]
    Adapter(#[from] anyhow::Error),
}

impl AcxError {
    /// Tenant id missing with the default message
    pub fn missing_tenant() -> Self {
        AcxError::MissingTenant {
            message: "Tenant id is required for authorization.".to_string(),
            details: None,
        }
    }

    /// Create an invalid policy error
    pub fn invalid_policy<S: Into<String>>(msg: S) -> Self {
        AcxError::InvalidPolicy {
            message: msg.into(),
            details: None,
        }
    }

    /// Create an engine error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        AcxError::Engine {
            message: msg.into(),
            details: None,
        }
    }

    /// Attach structured details. Adapter errors keep their source untouched.
    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            AcxError::MissingTenant { details, .. }
            | AcxError::InvalidPolicy { details, .. }
            | AcxError::Engine { details, .. } => *details = Some(value),
            AcxError::Adapter(_) => {}
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AcxError::MissingTenant { .. } => ErrorCode::MissingTenant,
            AcxError::InvalidPolicy { .. } => ErrorCode::InvalidPolicy,
            AcxError::Engine { .. } | AcxError::Adapter(_) => ErrorCode::Engine,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            AcxError::MissingTenant { details, .. }
            | AcxError::InvalidPolicy { details, .. }
            | AcxError::Engine { details, .. } => details.as_ref(),
            AcxError::Adapter(_) => None,
        }
    }
}
