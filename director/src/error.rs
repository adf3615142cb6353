//! Director-specific error types

use shared::{GatewayError, SharedError};
use thiserror::Error;

use crate::core::ResourceKind;

#[derive(Error, Debug)]
pub enum DirectorError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{kind} \"{name}\" already created, delete it first")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("Cannot create {kind}: {requires} has not been created")]
    MissingDependency {
        kind: ResourceKind,
        requires: ResourceKind,
    },

    #[error("{kind} has not been created")]
    NotCreated { kind: ResourceKind },

    #[error("Unexpected: no backends were loaded for {service}")]
    NoBackends { service: ResourceKind },

    #[error("Couldn't find unused forwarding rule port in [{lo}, {hi}] after {attempts} attempts")]
    PortsExhausted { lo: u16, hi: u16, attempts: u32 },

    #[error("Gateway call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn missing(kind: ResourceKind, requires: ResourceKind) -> Self {
        Self::MissingDependency { kind, requires }
    }

    pub fn not_created(kind: ResourceKind) -> Self {
        Self::NotCreated { kind }
    }
}

pub type DirectorResult<T> = Result<T, DirectorError>;
