//! Test helpers and builder patterns for director tests
//!
//! Mocks start without expectations, so any remote call a test did not
//! declare fails the test. Helpers add the expectations for the common
//! creation paths.
use director::*;
use shared::{BackendProtocol, HealthCheckProtocol};

use super::fixtures::TestFixtures;

/// Builder for orchestrators wired to mockall gateways
pub struct DirectorBuilder {
    config: DirectorConfig,
    compute: MockComputeGateway,
    netsec: MockNetworkSecurityGateway,
    netsvc: MockNetworkServicesGateway,
}

impl DirectorBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            compute: MockComputeGateway::new(),
            netsec: MockNetworkSecurityGateway::new(),
            netsvc: MockNetworkServicesGateway::new(),
        }
    }

    pub fn with_config(mut self, config: DirectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dualstack(mut self) -> Self {
        self.config = self.config.with_dualstack(true);
        self
    }

    /// Configure the compute mock with a setup function
    pub fn with_compute<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockComputeGateway),
    {
        setup(&mut self.compute);
        self
    }

    /// Configure the network security mock with a setup function
    pub fn with_netsec<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockNetworkSecurityGateway),
    {
        setup(&mut self.netsec);
        self
    }

    /// Configure the network services mock with a setup function
    pub fn with_netsvc<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockNetworkServicesGateway),
    {
        setup(&mut self.netsvc);
        self
    }

    pub fn build(self) -> TestDirector {
        TrafficDirector::new(self.compute, self.config)
    }

    pub fn build_mesh(self) -> TestMeshDirector {
        Layered::with_mesh(self.compute, self.netsvc, self.config)
    }

    pub fn build_secure(self) -> TestSecureDirector {
        Layered::with_security(self.compute, self.netsec, self.netsvc, self.config)
    }
}

impl Default for DirectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub type TestDirector = TrafficDirector<MockComputeGateway>;
pub type TestMeshDirector = MeshDirector<MockComputeGateway, MockNetworkServicesGateway>;
pub type TestSecureDirector =
    SecureDirector<MockComputeGateway, MockNetworkSecurityGateway, MockNetworkServicesGateway>;

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Expect one health check and one default backend service creation
    pub fn expect_backend_half(compute: &mut MockComputeGateway) {
        compute
            .expect_create_health_check()
            .times(1)
            .returning(|name, _, _| Ok(TestFixtures::compute_ref("healthChecks", name)));
        compute
            .expect_create_backend_service()
            .times(1)
            .returning(|spec| Ok(TestFixtures::compute_ref("backendServices", &spec.name)));
    }

    /// Expect url map, GRPC proxy and forwarding rule creation
    pub fn expect_grpc_routing_half(compute: &mut MockComputeGateway) {
        compute
            .expect_create_url_map()
            .times(1)
            .returning(|body| Ok(TestFixtures::compute_ref("urlMaps", &body.name)));
        compute
            .expect_create_target_grpc_proxy()
            .times(1)
            .returning(|name, _, _| Ok(TestFixtures::compute_ref("targetGrpcProxies", name)));
        compute
            .expect_create_forwarding_rule()
            .times(1)
            .returning(|spec| Ok(TestFixtures::compute_ref("forwardingRules", &spec.name)));
    }

    /// Resolve NEG lookups to the fixture NEG in the requested zone
    pub fn expect_neg_lookups(compute: &mut MockComputeGateway) {
        compute
            .expect_wait_for_network_endpoint_group()
            .returning(|_, zone| Ok(TestFixtures::neg(zone)));
    }

    /// Orchestrator with health check and GRPC backend service in place
    pub fn director_with_backend<F>(extra: F) -> TestDirector
    where
        F: FnOnce(&mut MockComputeGateway),
    {
        let mut director = DirectorBuilder::new()
            .with_compute(|compute| {
                Self::expect_backend_half(compute);
                extra(compute);
            })
            .build();
        director
            .create_health_check(Some(HealthCheckProtocol::Grpc), None)
            .unwrap();
        director
            .create_backend_service(Some(BackendProtocol::Grpc), Default::default())
            .unwrap();
        director
    }
}
