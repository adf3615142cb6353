//! Tests for the in-memory control plane
//!
//! Focus on the referential integrity rules the orchestrator relies on when
//! it runs against this plane.

use std::net::{IpAddr, Ipv4Addr};

use assert_matches::assert_matches;
use shared::{
    BackendPatchOptions, BackendProtocol, BackendServiceOptions, BackendServiceSpec,
    ForwardingRuleSpec, GatewayError, HealthCheckProtocol, UrlMapBody,
};

use super::common::{plane, TEST_ZONE};
use crate::services::in_memory::*;
use crate::traits::{ComputeGateway, NetworkServicesGateway};

fn backend_spec(name: &str, health_check_url: &str) -> BackendServiceSpec {
    BackendServiceSpec {
        name: name.to_string(),
        health_check: Some(health_check_url.to_string()),
        protocol: BackendProtocol::Grpc,
        options: BackendServiceOptions::default(),
        enable_dualstack: false,
    }
}

#[test]
fn test_create_and_get_round_trip() {
    let plane = plane();
    let created = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();

    assert_eq!(created.kind, HEALTH_CHECKS);
    assert!(created.url.ends_with("/global/healthChecks/td-health-check"));
    assert!(plane.contains(HEALTH_CHECKS, "td-health-check"));
}

#[test]
fn test_duplicate_create_conflicts() {
    let plane = plane();
    plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();

    let err = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap_err();
    assert_matches!(err, GatewayError::Conflict { .. });
}

#[test]
fn test_create_with_missing_reference_is_rejected() {
    let plane = plane();
    let err = plane
        .create_backend_service(&backend_spec(
            "td-backend-service",
            "https://compute.googleapis.com/compute/v1/projects/test-project/global/healthChecks/missing",
        ))
        .unwrap_err();

    assert_eq!(err, GatewayError::not_found(HEALTH_CHECKS, "missing"));
    assert!(plane.is_empty());
}

#[test]
fn test_referenced_resource_cannot_be_deleted() {
    let plane = plane();
    let health_check = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();
    plane
        .create_backend_service(&backend_spec("td-backend-service", &health_check.url))
        .unwrap();

    let err = plane.delete_health_check("td-health-check").unwrap_err();
    assert_matches!(err, GatewayError::InUse { referrer, .. } if referrer == "backendServices/td-backend-service");

    plane.delete_backend_service("td-backend-service").unwrap();
    plane.delete_health_check("td-health-check").unwrap();
    assert!(plane.is_empty());
}

#[test]
fn test_delete_missing_is_not_found() {
    let plane = plane();
    let err = plane.delete_url_map("td-url-map").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_proxy_kinds_are_separate_collections() {
    let plane = plane();
    let health_check = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();
    let service = plane
        .create_backend_service(&backend_spec("td-backend-service", &health_check.url))
        .unwrap();
    let url_map = plane
        .create_url_map(&UrlMapBody::single_service(
            "td-url-map",
            "td-path-matcher",
            vec!["svc.example:8080".to_string()],
            service.url,
        ))
        .unwrap();
    plane
        .create_target_grpc_proxy("td-target-proxy", &url_map, true)
        .unwrap();

    assert!(plane.delete_target_http_proxy("td-target-proxy").unwrap_err().is_not_found());
    plane.delete_target_grpc_proxy("td-target-proxy").unwrap();
}

#[test]
fn test_port_availability_tracks_forwarding_rules() {
    let plane = plane();
    let health_check = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();
    let service = plane
        .create_backend_service(&backend_spec("td-backend-service", &health_check.url))
        .unwrap();
    let url_map = plane
        .create_url_map(&UrlMapBody::single_service(
            "td-url-map",
            "td-path-matcher",
            vec!["svc.example:8080".to_string()],
            service.url,
        ))
        .unwrap();
    let proxy = plane
        .create_target_grpc_proxy("td-target-proxy", &url_map, true)
        .unwrap();

    plane.reserve_port(9000);
    assert!(plane.exists_forwarding_rule(9000).unwrap());
    assert!(!plane.exists_forwarding_rule(8080).unwrap());

    plane
        .create_forwarding_rule(&ForwardingRuleSpec {
            name: "td-forwarding-rule".to_string(),
            port: 8080,
            target: proxy.url,
            network: "global/networks/default".to_string(),
            ip_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        })
        .unwrap();
    assert!(plane.exists_forwarding_rule(8080).unwrap());

    plane.delete_forwarding_rule("td-forwarding-rule").unwrap();
    assert!(!plane.exists_forwarding_rule(8080).unwrap());
}

#[test]
fn test_neg_lookup_and_health() {
    let plane = plane();
    let neg = plane.register_neg("server-neg", TEST_ZONE, 2);
    assert_eq!(
        plane.wait_for_network_endpoint_group("server-neg", TEST_ZONE).unwrap(),
        neg
    );
    assert_matches!(
        plane.wait_for_network_endpoint_group("server-neg", "europe-west1-b"),
        Err(GatewayError::Timeout { .. })
    );

    let health_check = plane
        .create_health_check("td-health-check", HealthCheckProtocol::Grpc, None)
        .unwrap();
    let service = plane
        .create_backend_service(&backend_spec("td-backend-service", &health_check.url))
        .unwrap();
    plane
        .patch_backends(&service, &[neg.clone()], &BackendPatchOptions::default())
        .unwrap();

    assert_eq!(plane.backends_of("td-backend-service"), vec![neg.clone()]);
    assert!(plane.wait_for_backends_healthy(&service, &[neg.clone()], 2).is_ok());
    assert_matches!(
        plane.wait_for_backends_healthy(&service, &[neg], 3),
        Err(GatewayError::Timeout { .. })
    );

    plane.remove_all_backends(&service).unwrap();
    assert!(plane.backends_of("td-backend-service").is_empty());
}

#[test]
fn test_injected_failure_applies_once() {
    let plane = plane();
    plane.fail_next(
        "create_mesh",
        GatewayError::Api {
            status: 503,
            message: "unavailable".to_string(),
        },
    );

    assert_matches!(
        plane.create_mesh("td-mesh", &Default::default()),
        Err(GatewayError::Api { status: 503, .. })
    );
    plane.create_mesh("td-mesh", &Default::default()).unwrap();
    assert_eq!(
        plane.get_mesh("td-mesh").unwrap().url,
        "projects/test-project/locations/global/meshes/td-mesh"
    );
}

#[test]
fn test_clones_share_state_and_journal() {
    let plane = plane();
    let other = plane.clone();

    other.create_mesh("td-mesh", &Default::default()).unwrap();

    assert!(plane.contains(MESHES, "td-mesh"));
    assert_eq!(plane.journal(), vec!["create_mesh meshes/td-mesh".to_string()]);

    let snapshot = plane.snapshot().unwrap();
    assert!(snapshot["resources"]["meshes/td-mesh"].is_object());
}

#[test]
fn test_full_name_matches_compute_key() {
    let plane = plane();
    assert_eq!(
        plane.resource_full_name("td-backend-service", BACKEND_SERVICES),
        "projects/test-project/locations/global/backendServices/td-backend-service"
    );
}
