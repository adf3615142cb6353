//! Simulated control plane implementing every gateway trait
//!
//! Resources live in memory keyed by `{collection}/{name}`. Each stored
//! resource remembers the keys it references, and deleting a resource that
//! something still references fails with `InUse`, the way the real platform
//! rejects out-of-order teardown. Clones share the same state, so one plane
//! can back the compute, network-security and network-services gateways of a
//! single orchestrator.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::debug;

use shared::{
    bodies::route_destinations, AuthorizationPolicyBody, BackendPatchOptions, BackendServicePatch,
    BackendServiceSpec, ClientTlsPolicyBody, EndpointPolicyBody, FirewallRuleSpec,
    ForwardingRuleSpec, GatewayError, GatewayResult, GrpcRouteBody, HealthCheckProtocol,
    HttpRouteBody, MeshBody, NegRef, ResourceRef, ServerTlsPolicyBody, UrlMapBody,
};

use crate::traits::{ComputeGateway, NetworkSecurityGateway, NetworkServicesGateway};

pub const HEALTH_CHECKS: &str = "healthChecks";
pub const BACKEND_SERVICES: &str = "backendServices";
pub const URL_MAPS: &str = "urlMaps";
pub const TARGET_GRPC_PROXIES: &str = "targetGrpcProxies";
pub const TARGET_HTTP_PROXIES: &str = "targetHttpProxies";
pub const FORWARDING_RULES: &str = "forwardingRules";
pub const FIREWALLS: &str = "firewalls";
pub const SERVER_TLS_POLICIES: &str = "serverTlsPolicies";
pub const CLIENT_TLS_POLICIES: &str = "clientTlsPolicies";
pub const AUTHORIZATION_POLICIES: &str = "authorizationPolicies";
pub const MESHES: &str = "meshes";
pub const GRPC_ROUTES: &str = "grpcRoutes";
pub const HTTP_ROUTES: &str = "httpRoutes";
pub const ENDPOINT_POLICIES: &str = "endpointPolicies";

/// One stored remote resource
#[derive(Debug, Clone, Serialize)]
pub struct StoredResource {
    pub resource: ResourceRef,
    /// Keys (`{collection}/{name}`) of resources this one points at
    pub references: BTreeSet<String>,
    pub body: serde_json::Value,
}

/// NEG seeded into the plane with its healthy endpoint count
#[derive(Debug, Clone, Serialize)]
pub struct SeededNeg {
    pub neg: NegRef,
    pub healthy_endpoints: u32,
}

#[derive(Debug, Default, Serialize)]
struct PlaneState {
    resources: BTreeMap<String, StoredResource>,
    /// Seeded NEGs keyed by `{zone}/{name}`
    negs: BTreeMap<String, SeededNeg>,
    /// Current backends per backend service key
    backends: BTreeMap<String, Vec<NegRef>>,
    /// Ports bound outside this plane's forwarding rules
    reserved_ports: BTreeSet<u16>,
    /// Every mutating call in order, as `{operation} {key}`
    journal: Vec<String>,
    #[serde(skip)]
    failures: BTreeMap<String, GatewayError>,
}

#[derive(Debug, Clone)]
pub struct InMemoryControlPlane {
    project: Rc<str>,
    compute_api_version: Rc<str>,
    state: Rc<RefCell<PlaneState>>,
}

/// `{collection}/{name}` from any resource URL or fully-qualified name
fn key_of(url: &str) -> String {
    let mut segments = url.rsplit('/');
    let name = segments.next().unwrap_or_default();
    let collection = segments.next().unwrap_or_default();
    format!("{collection}/{name}")
}

fn key(collection: &str, name: &str) -> String {
    format!("{collection}/{name}")
}

fn to_body<T: Serialize>(body: &T) -> GatewayResult<serde_json::Value> {
    serde_json::to_value(body).map_err(|err| GatewayError::Api {
        status: 400,
        message: err.to_string(),
    })
}

impl InMemoryControlPlane {
    pub fn new(project: impl Into<String>) -> Self {
        Self::with_api_version(project, "v1")
    }

    pub fn with_api_version(project: impl Into<String>, compute_api_version: impl Into<String>) -> Self {
        Self {
            project: Rc::from(project.into()),
            compute_api_version: Rc::from(compute_api_version.into()),
            state: Rc::new(RefCell::new(PlaneState::default())),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Seed a NEG the orchestrator can later resolve
    pub fn register_neg(&self, name: &str, zone: &str, healthy_endpoints: u32) -> NegRef {
        let neg = NegRef::new(
            name,
            zone,
            format!(
                "projects/{}/zones/{}/networkEndpointGroups/{}",
                self.project, zone, name
            ),
        );
        self.state.borrow_mut().negs.insert(
            key(zone, name),
            SeededNeg {
                neg: neg.clone(),
                healthy_endpoints,
            },
        );
        neg
    }

    /// Mark `port` as bound by something outside this plane
    pub fn reserve_port(&self, port: u16) {
        self.state.borrow_mut().reserved_ports.insert(port);
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: &str, error: GatewayError) {
        self.state
            .borrow_mut()
            .failures
            .insert(operation.to_string(), error);
    }

    pub fn contains(&self, collection: &str, name: &str) -> bool {
        self.state.borrow().resources.contains_key(&key(collection, name))
    }

    pub fn stored(&self, collection: &str, name: &str) -> Option<StoredResource> {
        self.state.borrow().resources.get(&key(collection, name)).cloned()
    }

    pub fn backends_of(&self, service_name: &str) -> Vec<NegRef> {
        self.state
            .borrow()
            .backends
            .get(&key(BACKEND_SERVICES, service_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Every stored resource in key order
    pub fn inventory(&self) -> Vec<ResourceRef> {
        self.state
            .borrow()
            .resources
            .values()
            .map(|stored| stored.resource.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().resources.is_empty()
    }

    pub fn journal(&self) -> Vec<String> {
        self.state.borrow().journal.clone()
    }

    /// Whole plane state as JSON
    pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&*self.state.borrow())
    }

    fn compute_url(&self, collection: &str, name: &str) -> String {
        format!(
            "https://compute.googleapis.com/compute/{}/projects/{}/global/{}/{}",
            self.compute_api_version, self.project, collection, name
        )
    }

    fn location_url(&self, collection: &str, name: &str) -> String {
        format!("projects/{}/locations/global/{}/{}", self.project, collection, name)
    }

    fn take_failure(&self, operation: &str) -> GatewayResult<()> {
        match self.state.borrow_mut().failures.remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn ensure_exists(&self, reference: &str) -> GatewayResult<()> {
        if self.state.borrow().resources.contains_key(reference) {
            return Ok(());
        }
        let (collection, name) = reference.split_once('/').unwrap_or(("", reference));
        Err(GatewayError::not_found(collection, name))
    }

    fn insert<T: Serialize>(
        &self,
        operation: &str,
        resource: ResourceRef,
        references: BTreeSet<String>,
        body: &T,
    ) -> GatewayResult<ResourceRef> {
        self.take_failure(operation)?;
        for reference in &references {
            self.ensure_exists(reference)?;
        }

        let stored_key = key(&resource.kind, &resource.name);
        let mut state = self.state.borrow_mut();
        if state.resources.contains_key(&stored_key) {
            return Err(GatewayError::Conflict {
                kind: resource.kind.clone(),
                name: resource.name.clone(),
            });
        }

        debug!("{} {}", operation, stored_key);
        state.journal.push(format!("{operation} {stored_key}"));
        state.resources.insert(
            stored_key,
            StoredResource {
                resource: resource.clone(),
                references,
                body: to_body(body)?,
            },
        );
        Ok(resource)
    }

    fn create_compute<T: Serialize>(
        &self,
        operation: &str,
        collection: &str,
        name: &str,
        references: BTreeSet<String>,
        body: &T,
    ) -> GatewayResult<ResourceRef> {
        let resource = ResourceRef::new(name, self.compute_url(collection, name), collection);
        self.insert(operation, resource, references, body)
    }

    fn create_located<T: Serialize>(
        &self,
        operation: &str,
        collection: &str,
        name: &str,
        references: BTreeSet<String>,
        body: &T,
    ) -> GatewayResult<()> {
        let resource = ResourceRef::new(name, self.location_url(collection, name), collection);
        self.insert(operation, resource, references, body).map(|_| ())
    }

    fn get(&self, collection: &str, name: &str) -> GatewayResult<ResourceRef> {
        self.state
            .borrow()
            .resources
            .get(&key(collection, name))
            .map(|stored| stored.resource.clone())
            .ok_or_else(|| GatewayError::not_found(collection, name))
    }

    fn remove(&self, operation: &str, collection: &str, name: &str) -> GatewayResult<()> {
        self.take_failure(operation)?;

        let stored_key = key(collection, name);
        let mut state = self.state.borrow_mut();
        if !state.resources.contains_key(&stored_key) {
            return Err(GatewayError::not_found(collection, name));
        }
        let referrer = state
            .resources
            .iter()
            .find(|(other, stored)| **other != stored_key && stored.references.contains(&stored_key))
            .map(|(other, _)| other.clone());
        if let Some(referrer) = referrer {
            return Err(GatewayError::InUse {
                kind: collection.to_string(),
                name: name.to_string(),
                referrer,
            });
        }

        debug!("{} {}", operation, stored_key);
        state.journal.push(format!("{operation} {stored_key}"));
        state.backends.remove(&stored_key);
        state.resources.remove(&stored_key);
        Ok(())
    }

    fn update<F>(&self, operation: &str, target: &ResourceRef, apply: F) -> GatewayResult<()>
    where
        F: FnOnce(&mut StoredResource) -> GatewayResult<()>,
    {
        self.take_failure(operation)?;

        let stored_key = key(&target.kind, &target.name);
        let mut state = self.state.borrow_mut();
        let stored = state
            .resources
            .get_mut(&stored_key)
            .ok_or_else(|| GatewayError::not_found(&target.kind, &target.name))?;
        apply(stored)?;

        debug!("{} {}", operation, stored_key);
        state.journal.push(format!("{operation} {stored_key}"));
        Ok(())
    }

    fn bound_ports(&self) -> BTreeSet<u16> {
        let state = self.state.borrow();
        state
            .resources
            .values()
            .filter(|stored| stored.resource.kind == FORWARDING_RULES)
            .filter_map(|stored| stored.body.get("port").and_then(|port| port.as_u64()))
            .filter_map(|port| u16::try_from(port).ok())
            .chain(state.reserved_ports.iter().copied())
            .collect()
    }
}

impl ComputeGateway for InMemoryControlPlane {
    fn create_health_check(
        &self,
        name: &str,
        protocol: HealthCheckProtocol,
        port: Option<u16>,
    ) -> GatewayResult<ResourceRef> {
        let body = serde_json::json!({ "name": name, "type": protocol, "port": port });
        self.create_compute("create_health_check", HEALTH_CHECKS, name, BTreeSet::new(), &body)
    }

    fn delete_health_check(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_health_check", HEALTH_CHECKS, name)
    }

    fn create_backend_service(&self, spec: &BackendServiceSpec) -> GatewayResult<ResourceRef> {
        let references = spec.health_check.iter().map(|url| key_of(url)).collect();
        self.create_compute("create_backend_service", BACKEND_SERVICES, &spec.name, references, spec)
    }

    fn get_backend_service(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(BACKEND_SERVICES, name)
    }

    fn patch_backend_service(
        &self,
        service: &ResourceRef,
        patch: &BackendServicePatch,
    ) -> GatewayResult<()> {
        if let Some(settings) = &patch.security_settings {
            self.ensure_exists(&key_of(&settings.client_tls_policy))?;
        }
        let patch_body = to_body(patch)?;
        self.update("patch_backend_service", service, |stored| {
            if let Some(settings) = &patch.security_settings {
                stored.references.insert(key_of(&settings.client_tls_policy));
            }
            if let (Some(body), Some(fields)) = (stored.body.as_object_mut(), patch_body.as_object()) {
                body.extend(fields.clone());
            }
            Ok(())
        })
    }

    fn delete_backend_service(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_backend_service", BACKEND_SERVICES, name)
    }

    fn wait_for_network_endpoint_group(&self, name: &str, zone: &str) -> GatewayResult<NegRef> {
        self.state
            .borrow()
            .negs
            .get(&key(zone, name))
            .map(|seeded| seeded.neg.clone())
            .ok_or_else(|| GatewayError::timeout(format!("NEG {name} in zone {zone}")))
    }

    fn patch_backends(
        &self,
        service: &ResourceRef,
        backends: &[NegRef],
        options: &BackendPatchOptions,
    ) -> GatewayResult<()> {
        let service_key = key(&service.kind, &service.name);
        let options_body = to_body(options)?;
        self.update("patch_backends", service, |stored| {
            stored.body["backendOptions"] = options_body;
            Ok(())
        })?;
        self.state
            .borrow_mut()
            .backends
            .insert(service_key, backends.to_vec());
        Ok(())
    }

    fn remove_all_backends(&self, service: &ResourceRef) -> GatewayResult<()> {
        let service_key = key(&service.kind, &service.name);
        self.update("remove_all_backends", service, |_| Ok(()))?;
        self.state.borrow_mut().backends.remove(&service_key);
        Ok(())
    }

    fn wait_for_backends_healthy(
        &self,
        service: &ResourceRef,
        backends: &[NegRef],
        replica_count: u32,
    ) -> GatewayResult<()> {
        self.take_failure("wait_for_backends_healthy")?;
        let state = self.state.borrow();
        let attached = state
            .backends
            .get(&key(&service.kind, &service.name))
            .cloned()
            .unwrap_or_default();
        let healthy: u32 = backends
            .iter()
            .filter(|neg| attached.contains(neg))
            .filter_map(|neg| state.negs.get(&key(&neg.zone, &neg.name)))
            .map(|seeded| seeded.healthy_endpoints)
            .sum();

        if healthy >= replica_count {
            Ok(())
        } else {
            Err(GatewayError::timeout(format!(
                "{replica_count} healthy backends on {} (found {healthy})",
                service.name
            )))
        }
    }

    fn create_url_map(&self, body: &UrlMapBody) -> GatewayResult<ResourceRef> {
        let references = body
            .referenced_services()
            .iter()
            .map(|url| key_of(url))
            .collect();
        self.create_compute("create_url_map", URL_MAPS, &body.name, references, body)
    }

    fn patch_url_map(&self, url_map: &ResourceRef, body: &UrlMapBody) -> GatewayResult<()> {
        let references: BTreeSet<String> = body
            .referenced_services()
            .iter()
            .map(|url| key_of(url))
            .collect();
        for reference in &references {
            self.ensure_exists(reference)?;
        }
        let new_body = to_body(body)?;
        self.update("patch_url_map", url_map, |stored| {
            stored.references = references;
            stored.body = new_body;
            Ok(())
        })
    }

    fn delete_url_map(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_url_map", URL_MAPS, name)
    }

    fn create_target_grpc_proxy(
        &self,
        name: &str,
        url_map: &ResourceRef,
        validate_for_proxyless: bool,
    ) -> GatewayResult<ResourceRef> {
        let body = serde_json::json!({
            "name": name,
            "urlMap": url_map.url,
            "validateForProxyless": validate_for_proxyless,
        });
        let references = BTreeSet::from([key_of(&url_map.url)]);
        self.create_compute("create_target_grpc_proxy", TARGET_GRPC_PROXIES, name, references, &body)
    }

    fn create_target_http_proxy(&self, name: &str, url_map: &ResourceRef) -> GatewayResult<ResourceRef> {
        let body = serde_json::json!({ "name": name, "urlMap": url_map.url });
        let references = BTreeSet::from([key_of(&url_map.url)]);
        self.create_compute("create_target_http_proxy", TARGET_HTTP_PROXIES, name, references, &body)
    }

    fn delete_target_grpc_proxy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_target_grpc_proxy", TARGET_GRPC_PROXIES, name)
    }

    fn delete_target_http_proxy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_target_http_proxy", TARGET_HTTP_PROXIES, name)
    }

    fn exists_forwarding_rule(&self, port: u16) -> GatewayResult<bool> {
        self.take_failure("exists_forwarding_rule")?;
        Ok(self.bound_ports().contains(&port))
    }

    fn create_forwarding_rule(&self, spec: &ForwardingRuleSpec) -> GatewayResult<ResourceRef> {
        let references = BTreeSet::from([key_of(&spec.target)]);
        self.create_compute("create_forwarding_rule", FORWARDING_RULES, &spec.name, references, spec)
    }

    fn delete_forwarding_rule(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_forwarding_rule", FORWARDING_RULES, name)
    }

    fn create_firewall_rule(&self, spec: &FirewallRuleSpec) -> GatewayResult<ResourceRef> {
        self.create_compute("create_firewall_rule", FIREWALLS, &spec.name, BTreeSet::new(), spec)
    }

    fn delete_firewall_rule(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_firewall_rule", FIREWALLS, name)
    }
}

impl NetworkSecurityGateway for InMemoryControlPlane {
    fn create_server_tls_policy(&self, name: &str, body: &ServerTlsPolicyBody) -> GatewayResult<()> {
        self.create_located("create_server_tls_policy", SERVER_TLS_POLICIES, name, BTreeSet::new(), body)
    }

    fn get_server_tls_policy(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(SERVER_TLS_POLICIES, name)
    }

    fn delete_server_tls_policy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_server_tls_policy", SERVER_TLS_POLICIES, name)
    }

    fn create_client_tls_policy(&self, name: &str, body: &ClientTlsPolicyBody) -> GatewayResult<()> {
        self.create_located("create_client_tls_policy", CLIENT_TLS_POLICIES, name, BTreeSet::new(), body)
    }

    fn get_client_tls_policy(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(CLIENT_TLS_POLICIES, name)
    }

    fn delete_client_tls_policy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_client_tls_policy", CLIENT_TLS_POLICIES, name)
    }

    fn create_authz_policy(&self, name: &str, body: &AuthorizationPolicyBody) -> GatewayResult<()> {
        self.create_located("create_authz_policy", AUTHORIZATION_POLICIES, name, BTreeSet::new(), body)
    }

    fn get_authz_policy(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(AUTHORIZATION_POLICIES, name)
    }

    fn delete_authz_policy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_authz_policy", AUTHORIZATION_POLICIES, name)
    }
}

impl NetworkServicesGateway for InMemoryControlPlane {
    fn create_mesh(&self, name: &str, body: &MeshBody) -> GatewayResult<()> {
        self.create_located("create_mesh", MESHES, name, BTreeSet::new(), body)
    }

    fn get_mesh(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(MESHES, name)
    }

    fn delete_mesh(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_mesh", MESHES, name)
    }

    fn create_grpc_route(&self, name: &str, body: &GrpcRouteBody) -> GatewayResult<()> {
        let references = body
            .meshes
            .iter()
            .cloned()
            .chain(route_destinations(&body.rules))
            .map(|reference| key_of(&reference))
            .collect();
        self.create_located("create_grpc_route", GRPC_ROUTES, name, references, body)
    }

    fn get_grpc_route(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(GRPC_ROUTES, name)
    }

    fn delete_grpc_route(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_grpc_route", GRPC_ROUTES, name)
    }

    fn create_http_route(&self, name: &str, body: &HttpRouteBody) -> GatewayResult<()> {
        let references = body
            .meshes
            .iter()
            .cloned()
            .chain(route_destinations(&body.rules))
            .map(|reference| key_of(&reference))
            .collect();
        self.create_located("create_http_route", HTTP_ROUTES, name, references, body)
    }

    fn get_http_route(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(HTTP_ROUTES, name)
    }

    fn delete_http_route(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_http_route", HTTP_ROUTES, name)
    }

    fn create_endpoint_policy(&self, name: &str, body: &EndpointPolicyBody) -> GatewayResult<()> {
        let references = body
            .server_tls_policy
            .iter()
            .map(|policy| key(SERVER_TLS_POLICIES, policy))
            .chain(
                body.authorization_policy
                    .iter()
                    .map(|policy| key(AUTHORIZATION_POLICIES, policy)),
            )
            .collect();
        self.create_located("create_endpoint_policy", ENDPOINT_POLICIES, name, references, body)
    }

    fn get_endpoint_policy(&self, name: &str) -> GatewayResult<ResourceRef> {
        self.get(ENDPOINT_POLICIES, name)
    }

    fn delete_endpoint_policy(&self, name: &str) -> GatewayResult<()> {
        self.remove("delete_endpoint_policy", ENDPOINT_POLICIES, name)
    }

    fn resource_full_name(&self, name: &str, collection: &str) -> String {
        self.location_url(collection, name)
    }
}
