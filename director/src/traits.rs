//! Gateway trait definitions with mockall annotations for testing
//!
//! The orchestrator owns no wire protocol; every remote effect goes through
//! one of these three gateways. They are injected into the orchestrator and
//! its extensions, which keeps the sequencing logic testable without a live
//! control plane.

use shared::{
    AuthorizationPolicyBody, BackendPatchOptions, BackendServicePatch, BackendServiceSpec,
    ClientTlsPolicyBody, EndpointPolicyBody, FirewallRuleSpec, ForwardingRuleSpec, GatewayResult,
    GrpcRouteBody, HealthCheckProtocol, HttpRouteBody, MeshBody, NegRef, ResourceRef,
    ServerTlsPolicyBody, UrlMapBody,
};

/// Compute API abstraction
///
/// Covers health checks, backend services and their NEG backends, routing
/// maps, target proxies, forwarding rules and firewall rules.
#[mockall::automock]
pub trait ComputeGateway {
    /// Create a health check
    ///
    /// # Parameters
    /// - `name`: Derived resource name
    /// - `protocol`: Probe protocol
    /// - `port`: Fixed probe port, or `None` to probe the serving port
    fn create_health_check(
        &self,
        name: &str,
        protocol: HealthCheckProtocol,
        port: Option<u16>,
    ) -> GatewayResult<ResourceRef>;

    fn delete_health_check(&self, name: &str) -> GatewayResult<()>;

    /// Create a traffic-director backend service
    fn create_backend_service(&self, spec: &BackendServiceSpec) -> GatewayResult<ResourceRef>;

    /// Load an existing backend service by name
    fn get_backend_service(&self, name: &str) -> GatewayResult<ResourceRef>;

    /// Patch fields of an existing backend service in place
    fn patch_backend_service(
        &self,
        service: &ResourceRef,
        patch: &BackendServicePatch,
    ) -> GatewayResult<()>;

    fn delete_backend_service(&self, name: &str) -> GatewayResult<()>;

    /// Wait for a zonal network endpoint group to appear
    ///
    /// Blocks until the NEG exists or the gateway's own deadline expires.
    fn wait_for_network_endpoint_group(&self, name: &str, zone: &str) -> GatewayResult<NegRef>;

    /// Replace the backends of a service with the given full set
    fn patch_backends(
        &self,
        service: &ResourceRef,
        backends: &[NegRef],
        options: &BackendPatchOptions,
    ) -> GatewayResult<()>;

    fn remove_all_backends(&self, service: &ResourceRef) -> GatewayResult<()>;

    /// Block until at least `replica_count` endpoints report healthy
    ///
    /// Polling cadence and deadline belong to the gateway.
    fn wait_for_backends_healthy(
        &self,
        service: &ResourceRef,
        backends: &[NegRef],
        replica_count: u32,
    ) -> GatewayResult<()>;

    fn create_url_map(&self, body: &UrlMapBody) -> GatewayResult<ResourceRef>;

    fn patch_url_map(&self, url_map: &ResourceRef, body: &UrlMapBody) -> GatewayResult<()>;

    fn delete_url_map(&self, name: &str) -> GatewayResult<()>;

    /// Create a target gRPC proxy
    ///
    /// # Parameters
    /// - `validate_for_proxyless`: Ask the platform to reject routing maps
    ///   proxyless clients cannot consume
    fn create_target_grpc_proxy(
        &self,
        name: &str,
        url_map: &ResourceRef,
        validate_for_proxyless: bool,
    ) -> GatewayResult<ResourceRef>;

    fn create_target_http_proxy(&self, name: &str, url_map: &ResourceRef) -> GatewayResult<ResourceRef>;

    fn delete_target_grpc_proxy(&self, name: &str) -> GatewayResult<()>;

    fn delete_target_http_proxy(&self, name: &str) -> GatewayResult<()>;

    /// Whether any forwarding rule already binds `port`
    fn exists_forwarding_rule(&self, port: u16) -> GatewayResult<bool>;

    fn create_forwarding_rule(&self, spec: &ForwardingRuleSpec) -> GatewayResult<ResourceRef>;

    fn delete_forwarding_rule(&self, name: &str) -> GatewayResult<()>;

    fn create_firewall_rule(&self, spec: &FirewallRuleSpec) -> GatewayResult<ResourceRef>;

    fn delete_firewall_rule(&self, name: &str) -> GatewayResult<()>;
}

/// Network security API abstraction
///
/// Create calls return nothing; callers re-read the resource with the
/// matching `get_*` call.
#[mockall::automock]
pub trait NetworkSecurityGateway {
    fn create_server_tls_policy(&self, name: &str, body: &ServerTlsPolicyBody) -> GatewayResult<()>;

    fn get_server_tls_policy(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_server_tls_policy(&self, name: &str) -> GatewayResult<()>;

    fn create_client_tls_policy(&self, name: &str, body: &ClientTlsPolicyBody) -> GatewayResult<()>;

    fn get_client_tls_policy(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_client_tls_policy(&self, name: &str) -> GatewayResult<()>;

    fn create_authz_policy(&self, name: &str, body: &AuthorizationPolicyBody) -> GatewayResult<()>;

    fn get_authz_policy(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_authz_policy(&self, name: &str) -> GatewayResult<()>;
}

/// Network services API abstraction
///
/// Like the security gateway, creation is followed by an explicit read.
#[mockall::automock]
pub trait NetworkServicesGateway {
    fn create_mesh(&self, name: &str, body: &MeshBody) -> GatewayResult<()>;

    fn get_mesh(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_mesh(&self, name: &str) -> GatewayResult<()>;

    fn create_grpc_route(&self, name: &str, body: &GrpcRouteBody) -> GatewayResult<()>;

    fn get_grpc_route(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_grpc_route(&self, name: &str) -> GatewayResult<()>;

    fn create_http_route(&self, name: &str, body: &HttpRouteBody) -> GatewayResult<()>;

    fn get_http_route(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_http_route(&self, name: &str) -> GatewayResult<()>;

    fn create_endpoint_policy(&self, name: &str, body: &EndpointPolicyBody) -> GatewayResult<()>;

    fn get_endpoint_policy(&self, name: &str) -> GatewayResult<ResourceRef>;

    fn delete_endpoint_policy(&self, name: &str) -> GatewayResult<()>;

    /// Fully-qualified name of a resource in another collection
    ///
    /// # Parameters
    /// - `name`: Short resource name
    /// - `collection`: Remote collection, e.g. `backendServices`
    ///
    /// # Returns
    /// Name of the form `projects/{project}/locations/global/{collection}/{name}`
    fn resource_full_name(&self, name: &str, collection: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that mock gateways can be instantiated
    #[test]
    fn test_mock_gateway_instantiation() {
        let _compute = MockComputeGateway::new();
        let _netsec = MockNetworkSecurityGateway::new();
        let _netsvc = MockNetworkServicesGateway::new();
    }
}
