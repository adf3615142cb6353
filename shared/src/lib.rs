//! Shared types for the traffic director workspace
//!
//! Contains the resource handles, protocol enums, request bodies and gateway
//! errors exchanged between the orchestrator and the control-plane gateways.
//! Nothing in here performs I/O apart from tracing initialisation.

pub mod bodies;
pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-export the request bodies most call sites need
pub use bodies::{
    // Compute
    BackendPatchOptions, BackendServiceOptions, BackendServicePatch, BackendServiceSpec,
    CircuitBreakers, FirewallRuleSpec, ForwardingRuleSpec, HostRule, LocalityLbPolicy,
    OutlierDetection, PathMatcher, SecuritySettings, UrlMapBody,

    // Network security
    AuthorizationPolicyBody, AuthzAction, AuthzRule, CertificateProvider, ClientTlsPolicyBody,
    ServerTlsPolicyBody,

    // Network services
    EndpointPolicyBody, GrpcRouteBody, HttpRouteBody, MeshBody, RouteAction, RouteDestination,
};
