//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Handle to a remote resource as returned by a gateway
///
/// Immutable once returned. The orchestrator never stores remote IDs; identity
/// is derived from the resource name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub url: String,
    /// Remote collection the resource lives in, e.g. `backendServices`
    pub kind: String,
}

impl ResourceRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Zonal network endpoint group reference
///
/// Ordering and equality follow (zone, name) so membership sets stay
/// deterministic when pushed to a backend service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NegRef {
    pub zone: String,
    pub name: String,
    pub url: String,
}

impl NegRef {
    pub fn new(name: impl Into<String>, zone: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for NegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.name)
    }
}

/// Load balancing protocol of a backend service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackendProtocol {
    Grpc,
    Http2,
    /// Never valid for operations that create protocol-specific resources
    #[default]
    Unset,
}

impl BackendProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendProtocol::Grpc => "GRPC",
            BackendProtocol::Http2 => "HTTP2",
            BackendProtocol::Unset => "UNSET",
        }
    }
}

impl fmt::Display for BackendProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendProtocol {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grpc" => Ok(BackendProtocol::Grpc),
            "http2" => Ok(BackendProtocol::Http2),
            "unset" => Ok(BackendProtocol::Unset),
            _ => Err(SharedError::InvalidProtocol { input: s.to_string() }),
        }
    }
}

/// Protocol used by a health check
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckProtocol {
    #[default]
    Grpc,
    Http,
    Tcp,
}

impl HealthCheckProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCheckProtocol::Grpc => "GRPC",
            HealthCheckProtocol::Http => "HTTP",
            HealthCheckProtocol::Tcp => "TCP",
        }
    }
}

impl fmt::Display for HealthCheckProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthCheckProtocol {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grpc" => Ok(HealthCheckProtocol::Grpc),
            "http" => Ok(HealthCheckProtocol::Http),
            "tcp" => Ok(HealthCheckProtocol::Tcp),
            _ => Err(SharedError::InvalidProtocol { input: s.to_string() }),
        }
    }
}
