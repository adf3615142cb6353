//! Integration tests against the in-memory control plane
//!
//! The plane rejects deleting anything still referenced, so these tests
//! catch ordering mistakes a mock-based test would only see if it spelled
//! out the exact sequence.

use assert_matches::assert_matches;
use director::services::in_memory::{
    BACKEND_SERVICES, FIREWALLS, FORWARDING_RULES, GRPC_ROUTES, MESHES, TARGET_GRPC_PROXIES,
    TARGET_HTTP_PROXIES, URL_MAPS,
};
use director::*;
use rand::{rngs::StdRng, SeedableRng};
use shared::{BackendProtocol, GatewayError};

mod common;
use common::TestFixtures;

type PlaneDirector = TrafficDirector<InMemoryControlPlane>;

fn plane() -> InMemoryControlPlane {
    let plane = InMemoryControlPlane::new(TestFixtures::PROJECT);
    plane.register_neg(TestFixtures::NEG_NAME, TestFixtures::ZONE_A, 2);
    plane.register_neg(TestFixtures::NEG_NAME, TestFixtures::ZONE_B, 1);
    plane
}

fn director(plane: &InMemoryControlPlane) -> PlaneDirector {
    TrafficDirector::new(plane.clone(), TestFixtures::config())
}

fn zones() -> [&'static str; 2] {
    [TestFixtures::ZONE_A, TestFixtures::ZONE_B]
}

#[test]
fn test_full_lifecycle_leaves_plane_empty() {
    // Arrange
    let plane = plane();
    let mut director = director(&plane);

    // Act
    director
        .setup_for_grpc(TestFixtures::HOST, TestFixtures::PORT, None, None)
        .unwrap();
    director
        .add_backends(BackendVariant::Default, TestFixtures::NEG_NAME, &zones(), None)
        .unwrap();
    director
        .wait_for_backends_healthy(BackendVariant::Default, 3)
        .unwrap();

    // Assert
    assert_eq!(plane.inventory().len(), 5);
    assert!(plane.contains(TARGET_GRPC_PROXIES, "td-target-proxy-s1"));
    assert_eq!(plane.backends_of("td-backend-service-s1").len(), 2);
    assert_eq!(
        &plane.journal()[..5],
        [
            "create_health_check healthChecks/td-health-check-s1",
            "create_backend_service backendServices/td-backend-service-s1",
            "create_url_map urlMaps/td-url-map-s1",
            "create_target_grpc_proxy targetGrpcProxies/td-target-proxy-s1",
            "create_forwarding_rule forwardingRules/td-forwarding-rule-s1",
        ]
    );

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
    assert!(director.registry().is_empty());
}

#[test]
fn test_health_wait_times_out_below_replica_count() {
    let plane = plane();
    let mut director = director(&plane);
    director.setup_backend_for_grpc(None, None).unwrap();
    director
        .add_backends(BackendVariant::Default, TestFixtures::NEG_NAME, &[TestFixtures::ZONE_B], None)
        .unwrap();

    let err = director
        .wait_for_backends_healthy(BackendVariant::Default, 2)
        .unwrap_err();

    assert_matches!(err, DirectorError::Gateway(GatewayError::Timeout { .. }));
}

#[test]
fn test_out_of_order_delete_is_rejected() {
    let plane = plane();
    let mut director = director(&plane);
    director.setup_backend_for_grpc(None, None).unwrap();

    let err = director.delete_health_check(false).unwrap_err();

    assert_matches!(err, DirectorError::Gateway(GatewayError::InUse { .. }));
    assert!(director.registry().is_present(ResourceKind::HealthCheck));

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_http2_backend_lifecycle() {
    let plane = plane();
    let mut director = director(&plane);

    director
        .setup_for_grpc(TestFixtures::HOST, TestFixtures::PORT, Some(BackendProtocol::Http2), Some(8081))
        .unwrap();

    assert!(plane.contains(TARGET_HTTP_PROXIES, "td-target-proxy-s1"));
    assert!(!plane.contains(TARGET_GRPC_PROXIES, "td-target-proxy-s1"));

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_dualstack_lifecycle() {
    let plane = plane();
    let mut director = TrafficDirector::new(plane.clone(), TestFixtures::config().with_dualstack(true));

    director
        .setup_for_grpc(TestFixtures::HOST, TestFixtures::PORT, None, None)
        .unwrap();

    assert!(plane.contains(TARGET_HTTP_PROXIES, "td-target-proxy-ipv6-s1"));
    let rule = plane
        .stored(FORWARDING_RULES, "td-forwarding-rule-ipv6-s1")
        .unwrap();
    assert_eq!(rule.body["ipAddress"], "::");
    assert_eq!(
        plane.stored(BACKEND_SERVICES, "td-backend-service-s1").unwrap().body["enableDualstack"],
        true
    );

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_force_cleanup_from_fresh_orchestrator() {
    // Arrange: one process creates everything, then goes away
    let plane = plane();
    {
        let mut first = director(&plane);
        first
            .setup_for_grpc(TestFixtures::HOST, TestFixtures::PORT, None, None)
            .unwrap();
        first.create_affinity_backend_service(None).unwrap();
    }
    assert!(!plane.is_empty());

    // Act: a fresh orchestrator only knows the naming tuple
    let mut fresh = director(&plane);
    fresh.cleanup(true).unwrap();

    // Assert
    assert!(plane.is_empty());
}

#[test]
fn test_non_force_cleanup_from_fresh_orchestrator_is_noop() {
    let plane = plane();
    director(&plane).setup_backend_for_grpc(None, None).unwrap();
    let before = plane.journal().len();

    director(&plane).cleanup(false).unwrap();

    assert_eq!(plane.journal().len(), before);
    assert_eq!(plane.inventory().len(), 2);
}

#[test]
fn test_load_backend_service_from_fresh_orchestrator() {
    let plane = plane();
    director(&plane).setup_backend_for_grpc(None, None).unwrap();

    let mut fresh = director(&plane);
    fresh.load_backend_service(BackendVariant::Default).unwrap();
    fresh
        .add_backends(BackendVariant::Default, TestFixtures::NEG_NAME, &[TestFixtures::ZONE_A], Some(10))
        .unwrap();

    assert_eq!(plane.backends_of("td-backend-service-s1").len(), 1);
    let stored = plane.stored(BACKEND_SERVICES, "td-backend-service-s1").unwrap();
    assert_eq!(stored.body["backendOptions"]["maxRatePerEndpoint"], 10);
}

#[test]
fn test_alternative_routing_lifecycle() {
    let plane = plane();
    let mut director = director(&plane);
    director.setup_backend_for_grpc(None, None).unwrap();

    director.create_alternative_backend_service(None).unwrap();
    director
        .create_alternative_url_map(TestFixtures::HOST, TestFixtures::PORT, None)
        .unwrap();
    director.create_alternative_target_proxy().unwrap();
    director
        .create_alternative_forwarding_rule(TestFixtures::PORT, None)
        .unwrap();

    let proxy = plane
        .stored(TARGET_GRPC_PROXIES, "td-target-proxy-alt-s1")
        .unwrap();
    assert_eq!(proxy.body["validateForProxyless"], false);
    assert!(plane.contains(URL_MAPS, "td-url-map-alt-s1"));

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_patch_url_map_releases_previous_service() {
    let plane = plane();
    let mut director = director(&plane);
    director.setup_backend_for_grpc(None, None).unwrap();
    director.create_url_map(TestFixtures::HOST, TestFixtures::PORT).unwrap();
    let alternative = director.create_alternative_backend_service(None).unwrap();

    // While the map points at it the default service cannot go
    assert!(director
        .delete_backend_service(BackendVariant::Default, false)
        .is_err());

    director
        .patch_url_map(TestFixtures::HOST, TestFixtures::PORT, &alternative)
        .unwrap();

    assert!(director
        .delete_backend_service(BackendVariant::Default, false)
        .unwrap());
    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_port_search_skips_bound_ports() {
    let plane = plane();
    plane.reserve_port(5000);
    let director = director(&plane);
    let mut rng = StdRng::seed_from_u64(42);

    let free = director
        .find_unused_forwarding_rule_port_with(&mut rng, PortSearch { lo: 5001, hi: 5001, attempts: 3 })
        .unwrap();
    let exhausted =
        director.find_unused_forwarding_rule_port_with(&mut rng, PortSearch { lo: 5000, hi: 5000, attempts: 3 });

    assert_eq!(free, 5001);
    assert_matches!(
        exhausted,
        Err(DirectorError::PortsExhausted { lo: 5000, hi: 5000, attempts: 3 })
    );
}

#[test]
fn test_firewall_failure_is_retried_on_next_cleanup() {
    // Arrange
    let plane = plane();
    let mut director = director(&plane);
    director
        .create_firewall_rules(&["8080".to_string()], Some("35.191.0.0/16"), None)
        .unwrap();
    plane.fail_next(
        "delete_firewall_rule",
        GatewayError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        },
    );

    // Act: the failure is swallowed and the rest of cleanup runs
    director.cleanup(false).unwrap();

    // Assert
    assert!(plane.contains(FIREWALLS, "td-allow-health-checks-s1"));
    assert!(director.firewall_in_use());

    director.cleanup(false).unwrap();
    assert!(plane.is_empty());
    assert!(!director.firewall_in_use());
}

#[test]
fn test_mesh_lifecycle() {
    // Arrange
    let plane = plane();
    let mut mesh: MeshDirector<_, _> =
        Layered::with_mesh(plane.clone(), plane.clone(), TestFixtures::config());

    // Act
    mesh.base_mut().setup_backend_for_grpc(None, None).unwrap();
    mesh.base_mut()
        .add_backends(BackendVariant::Default, TestFixtures::NEG_NAME, &zones(), None)
        .unwrap();
    mesh.create_mesh().unwrap();
    mesh.create_grpc_route(TestFixtures::HOST, TestFixtures::PORT).unwrap();

    // Assert
    let route = plane.stored(GRPC_ROUTES, "td-grpc-route-s1").unwrap();
    assert!(route.references.contains("meshes/td-mesh-s1"));
    assert!(route.references.contains("backendServices/td-backend-service-s1"));
    assert_eq!(mesh.inventory().len(), 4);

    // The route pins the backend service, so the base alone cannot finish
    assert_matches!(
        mesh.base_mut().cleanup(false),
        Err(DirectorError::Gateway(GatewayError::InUse { .. }))
    );

    mesh.cleanup(false).unwrap();
    assert!(plane.is_empty());
    assert!(!plane.contains(MESHES, "td-mesh-s1"));
}

#[test]
fn test_mesh_force_cleanup_from_fresh_orchestrator() {
    let plane = plane();
    {
        let mut mesh: MeshDirector<_, _> =
            Layered::with_mesh(plane.clone(), plane.clone(), TestFixtures::config());
        mesh.base_mut().setup_backend_for_grpc(None, None).unwrap();
        mesh.create_mesh().unwrap();
        mesh.create_grpc_route(TestFixtures::HOST, TestFixtures::PORT).unwrap();
    }

    let mut fresh: MeshDirector<_, _> =
        Layered::with_mesh(plane.clone(), plane.clone(), TestFixtures::config());
    fresh.cleanup(true).unwrap();

    assert!(plane.is_empty());
}

#[test]
fn test_secure_lifecycle() {
    // Arrange
    let plane = plane();
    let mut secure: SecureDirector<_, _, _> = Layered::with_security(
        plane.clone(),
        plane.clone(),
        plane.clone(),
        TestFixtures::config(),
    );

    // Act
    secure
        .setup_server_security(TestFixtures::NAMESPACE, TestFixtures::SERVER_NAME, TestFixtures::PORT, true, true)
        .unwrap();
    secure
        .base_mut()
        .setup_for_grpc(TestFixtures::HOST, TestFixtures::PORT, None, None)
        .unwrap();
    secure
        .setup_client_security(TestFixtures::NAMESPACE, TestFixtures::SERVER_NAME, true, true)
        .unwrap();

    // Assert
    let service = plane.stored(BACKEND_SERVICES, "td-backend-service-s1").unwrap();
    assert!(service
        .references
        .contains("clientTlsPolicies/td-client-tls-policy-s1"));
    assert_eq!(
        service.body["securitySettings"]["subjectAltNames"][0],
        "spiffe://test-project.svc.id.goog/ns/psm/sa/psm-grpc-server"
    );

    secure.cleanup(false).unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_client_policy_without_backend_service() {
    let plane = plane();
    let mut secure: SecureDirector<_, _, _> = Layered::with_security(
        plane.clone(),
        plane.clone(),
        plane.clone(),
        TestFixtures::config(),
    );

    let err = secure
        .setup_client_security(TestFixtures::NAMESPACE, TestFixtures::SERVER_NAME, true, false)
        .unwrap_err();

    // The policy exists but nothing was patched
    assert_matches!(err, DirectorError::NotCreated { kind: ResourceKind::BackendService });
    assert!(secure
        .extension()
        .resource(ResourceKind::ClientTlsPolicy)
        .is_some());

    secure.cleanup(false).unwrap();
    assert!(plane.is_empty());
}
