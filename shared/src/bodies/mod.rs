//! Request bodies for the remote control-plane gateways
//!
//! Every body serialises in camelCase so it mirrors the remote schema field
//! for field. Bodies are grouped by the gateway that consumes them:
//! - `compute`: health checks, backend services, routing maps, proxies,
//!   forwarding rules and firewall rules
//! - `network_security`: TLS and authorization policies
//! - `network_services`: meshes, routes and endpoint policies

pub mod compute;
pub mod network_security;
pub mod network_services;

pub use compute::{
    BackendPatchOptions, BackendServiceOptions, BackendServicePatch, BackendServiceSpec,
    CircuitBreakers, CustomPolicy, FirewallRuleSpec, ForwardingRuleSpec, HostRule,
    LocalityLbPolicy, NamedPolicy, OutlierDetection, PathMatcher, SecuritySettings,
    UrlMapBody,
};

pub use network_security::{
    AuthorizationPolicyBody, AuthzAction, AuthzDestination, AuthzRule, AuthzSource,
    CertificateProvider, ClientTlsPolicyBody, MtlsPolicy, PluginInstance, ServerTlsPolicyBody,
};

pub use network_services::{
    EndpointMatcher, EndpointPolicyBody, EndpointPolicyType, GrpcRouteBody, HttpRouteBody,
    HttpRouteMatch, MetadataLabel, MetadataLabelMatcher, MeshBody, PortSelector, RouteAction,
    RouteDestination, RouteRule, route_destinations,
};
