//! Shared error types for the traffic director workspace

use thiserror::Error;

/// Failure reported by a remote control-plane gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Resource not found: {kind}/{name}")]
    NotFound { kind: String, name: String },

    #[error("Resource {kind}/{name} is still referenced by {referrer}")]
    InUse {
        kind: String,
        name: String,
        referrer: String,
    },

    #[error("Resource already exists: {kind}/{name}")]
    Conflict { kind: String, name: String },

    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },
}

impl GatewayError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid protocol: {input}")]
    InvalidProtocol { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
