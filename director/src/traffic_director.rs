//! Base traffic director orchestrator
//!
//! Owns the health check, the three backend service variants and their NEG
//! membership, the routing maps, target proxies, forwarding rules and
//! firewall rules. Every remote effect goes through the injected
//! `ComputeGateway`; this type only decides ordering and keeps the slots.

use rand::Rng;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, info, warn};

use shared::{
    BackendPatchOptions, BackendProtocol, BackendServiceOptions, BackendServicePatch,
    BackendServiceSpec, FirewallRuleSpec, ForwardingRuleSpec, HealthCheckProtocol, NegRef,
    ResourceRef, UrlMapBody,
};

use crate::{
    config::DirectorConfig,
    core::{BackendPools, BackendVariant, NamingPolicy, ResourceKind, ResourceRegistry},
    error::{DirectorError, DirectorResult},
    traits::ComputeGateway,
};

/// Metadata key used for header-based session affinity
pub const AFFINITY_METADATA_KEY: &str = "xds_md";

/// Base name of the path matcher shared by routing maps
pub const PATH_MATCHER_BASE_NAME: &str = "path-matcher";

/// Bounds for the random forwarding rule port search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSearch {
    pub lo: u16,
    pub hi: u16,
    pub attempts: u32,
}

impl Default for PortSearch {
    fn default() -> Self {
        Self {
            lo: 1024,
            hi: 65535,
            attempts: 25,
        }
    }
}

/// Dependency-ordered lifecycle for the compute-side resources
pub struct TrafficDirector<C: ComputeGateway> {
    /// Injected compute gateway
    compute: C,

    config: DirectorConfig,
    naming: NamingPolicy,

    /// One slot per base resource kind
    registry: ResourceRegistry,

    /// Protocol and NEG membership per backend service variant
    pools: BackendPools,

    /// Whether the default target proxy is HTTP-kind rather than GRPC-kind
    target_proxy_is_http: bool,

    /// Set once firewall rules were created; cleared when none remain
    firewall_in_use: bool,
}

impl<C: ComputeGateway> TrafficDirector<C> {
    pub fn new(compute: C, config: DirectorConfig) -> Self {
        let naming = NamingPolicy::new(&config.resource_prefix, &config.resource_suffix);
        Self {
            compute,
            config,
            naming,
            registry: ResourceRegistry::new(&ResourceKind::BASE),
            pools: BackendPools::default(),
            target_proxy_is_http: false,
            firewall_in_use: false,
        }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn naming(&self) -> &NamingPolicy {
        &self.naming
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    /// Derived name of a base resource kind
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        self.naming.name_for(kind.base_name())
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceRef> {
        self.registry.get(kind)
    }

    pub fn backend_service(&self, variant: BackendVariant) -> Option<&ResourceRef> {
        self.registry.get(variant.kind())
    }

    pub fn backend_protocol(&self, variant: BackendVariant) -> BackendProtocol {
        self.pools.protocol(variant)
    }

    pub fn backends(&self, variant: BackendVariant) -> &BTreeSet<NegRef> {
        self.pools.get(variant).members()
    }

    pub fn target_proxy_is_http(&self) -> bool {
        self.target_proxy_is_http
    }

    pub fn firewall_in_use(&self) -> bool {
        self.firewall_in_use
    }

    // ---------------------------------------------------------------------
    // Composite setup
    // ---------------------------------------------------------------------

    /// Full GRPC topology: backend half then routing half
    ///
    /// Stops at the first failure and leaves already-created resources in
    /// place; callers recover with `cleanup`.
    pub fn setup_for_grpc(
        &mut self,
        service_host: &str,
        service_port: u16,
        backend_protocol: Option<BackendProtocol>,
        health_check_port: Option<u16>,
    ) -> DirectorResult<()> {
        self.setup_backend_for_grpc(backend_protocol, health_check_port)?;
        self.setup_routing_rule_map_for_grpc(service_host, service_port)
    }

    pub fn setup_backend_for_grpc(
        &mut self,
        backend_protocol: Option<BackendProtocol>,
        health_check_port: Option<u16>,
    ) -> DirectorResult<()> {
        self.create_health_check(None, health_check_port)?;
        self.create_backend_service(backend_protocol, BackendServiceOptions::default())?;
        Ok(())
    }

    pub fn setup_routing_rule_map_for_grpc(
        &mut self,
        service_host: &str,
        service_port: u16,
    ) -> DirectorResult<()> {
        self.create_url_map(service_host, service_port)?;
        self.create_target_proxy()?;
        self.create_forwarding_rule(service_port)?;
        if self.config.enable_dualstack {
            self.create_target_proxy_ipv6()?;
            self.create_forwarding_rule_ipv6(service_port)?;
        }
        Ok(())
    }

    /// Tear down every base resource in reverse dependency order
    ///
    /// With `force` each name is recomputed and deleted even when the slot
    /// is `Absent`, which lets a fresh process clean up after another one.
    pub fn cleanup(&mut self, force: bool) -> DirectorResult<()> {
        self.delete_firewall_rules(force);
        self.delete_forwarding_rule(force)?;
        self.delete_alternative_forwarding_rule(force)?;
        self.delete_target_http_proxy(force)?;
        self.delete_target_grpc_proxy(force)?;
        if self.config.enable_dualstack {
            self.delete_forwarding_rule_ipv6(force)?;
            self.delete_target_proxy_ipv6(force)?;
        }
        self.delete_alternative_target_proxy(force)?;
        self.delete_url_map(force)?;
        self.delete_alternative_url_map(force)?;
        for variant in BackendVariant::ALL {
            self.delete_backend_service(variant, force)?;
        }
        self.delete_health_check(force)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Health check
    // ---------------------------------------------------------------------

    pub fn create_health_check(
        &mut self,
        protocol: Option<HealthCheckProtocol>,
        port: Option<u16>,
    ) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::HealthCheck;
        self.registry.ensure_absent(kind)?;

        let protocol = protocol.unwrap_or_default();
        let name = self.resource_name(kind);
        info!("Creating {} {} \"{}\"", protocol, kind, name);
        let resource = self.compute.create_health_check(&name, protocol, port)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    pub fn delete_health_check(&mut self, force: bool) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(ResourceKind::HealthCheck, force, &self.naming, |name| {
                compute.delete_health_check(name)
            })
    }

    // ---------------------------------------------------------------------
    // Backend services
    // ---------------------------------------------------------------------

    /// Create the default backend service
    ///
    /// `None` protocol means GRPC.
    pub fn create_backend_service(
        &mut self,
        protocol: Option<BackendProtocol>,
        options: BackendServiceOptions,
    ) -> DirectorResult<ResourceRef> {
        self.create_backend_variant(BackendVariant::Default, protocol, options)
    }

    pub fn create_alternative_backend_service(
        &mut self,
        protocol: Option<BackendProtocol>,
    ) -> DirectorResult<ResourceRef> {
        self.create_backend_variant(
            BackendVariant::Alternative,
            protocol,
            BackendServiceOptions::default(),
        )
    }

    /// Backend service routing on the `xds_md` metadata header
    pub fn create_affinity_backend_service(
        &mut self,
        protocol: Option<BackendProtocol>,
    ) -> DirectorResult<ResourceRef> {
        let options = BackendServiceOptions::default().with_affinity_header(AFFINITY_METADATA_KEY);
        self.create_backend_variant(BackendVariant::Affinity, protocol, options)
    }

    fn create_backend_variant(
        &mut self,
        variant: BackendVariant,
        protocol: Option<BackendProtocol>,
        options: BackendServiceOptions,
    ) -> DirectorResult<ResourceRef> {
        let kind = variant.kind();
        self.registry.ensure_absent(kind)?;
        let health_check = self.registry.require(ResourceKind::HealthCheck, kind)?;

        let protocol = protocol.unwrap_or(BackendProtocol::Grpc);
        let spec = BackendServiceSpec {
            name: self.resource_name(kind),
            health_check: Some(health_check.url.clone()),
            protocol,
            options,
            enable_dualstack: self.config.enable_dualstack,
        };

        info!("Creating {} {} \"{}\"", protocol, kind, spec.name);
        let resource = self.compute.create_backend_service(&spec)?;

        self.registry.insert(kind, resource.clone())?;
        self.pools.get_mut(variant).protocol = protocol;
        Ok(resource)
    }

    /// Attach to a backend service that already exists remotely
    pub fn load_backend_service(&mut self, variant: BackendVariant) -> DirectorResult<ResourceRef> {
        let kind = variant.kind();
        let name = self.resource_name(kind);
        let resource = self.compute.get_backend_service(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);

        self.registry.replace(kind, resource.clone());
        Ok(resource)
    }

    /// Patch an existing backend service in place
    pub fn patch_backend_service(
        &self,
        variant: BackendVariant,
        patch: &BackendServicePatch,
    ) -> DirectorResult<()> {
        let service = self.require_backend_service(variant)?;
        info!("Patching {} \"{}\"", variant, service.name);
        self.compute.patch_backend_service(service, patch)?;
        Ok(())
    }

    pub fn delete_backend_service(
        &mut self,
        variant: BackendVariant,
        force: bool,
    ) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(variant.kind(), force, &self.naming, |name| {
                compute.delete_backend_service(name)
            })
    }

    fn require_backend_service(&self, variant: BackendVariant) -> DirectorResult<&ResourceRef> {
        self.registry
            .get(variant.kind())
            .ok_or_else(|| DirectorError::not_created(variant.kind()))
    }

    // ---------------------------------------------------------------------
    // Backend membership
    // ---------------------------------------------------------------------

    /// Resolve `neg_name` in every zone and add the NEGs to `variant`
    ///
    /// The full resulting membership is pushed, not just the new NEGs.
    pub fn add_backends<Z: AsRef<str>>(
        &mut self,
        variant: BackendVariant,
        neg_name: &str,
        zones: &[Z],
        max_rate_per_endpoint: Option<u32>,
    ) -> DirectorResult<()> {
        self.require_backend_service(variant)?;

        let negs = self.resolve_negs(neg_name, zones)?;
        let pool = self.pools.get_mut(variant);
        pool.add(negs);
        if pool.is_empty() {
            return Err(DirectorError::NoBackends {
                service: variant.kind(),
            });
        }

        self.patch_backends(
            variant,
            &BackendPatchOptions {
                max_rate_per_endpoint,
                circuit_breakers: None,
            },
        )
    }

    pub fn remove_backends<Z: AsRef<str>>(
        &mut self,
        variant: BackendVariant,
        neg_name: &str,
        zones: &[Z],
    ) -> DirectorResult<()> {
        self.require_backend_service(variant)?;

        let negs: BTreeSet<NegRef> = self.resolve_negs(neg_name, zones)?.into_iter().collect();
        self.pools.get_mut(variant).remove(&negs);

        self.patch_backends(variant, &BackendPatchOptions::default())
    }

    /// Push the full current membership of `variant`
    pub fn patch_backends(
        &self,
        variant: BackendVariant,
        options: &BackendPatchOptions,
    ) -> DirectorResult<()> {
        let service = self.require_backend_service(variant)?;
        let backends = self.pools.get(variant).to_vec();

        info!(
            "Adding backends to {} \"{}\": {}",
            variant,
            service.name,
            backends
                .iter()
                .map(|neg| format!("{}/{}", neg.zone, neg.name))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.compute.patch_backends(service, &backends, options)?;
        Ok(())
    }

    /// Detach every backend remotely; local membership is left as is
    pub fn remove_all_backends(&self, variant: BackendVariant) -> DirectorResult<()> {
        let service = self.require_backend_service(variant)?;
        info!("Removing all backends from {} \"{}\"", variant, service.name);
        self.compute.remove_all_backends(service)?;
        Ok(())
    }

    pub fn wait_for_backends_healthy(
        &self,
        variant: BackendVariant,
        replica_count: u32,
    ) -> DirectorResult<()> {
        let service = self.require_backend_service(variant)?;
        let backends = self.pools.get(variant).to_vec();
        debug!(
            "Waiting for {} replicas of {} \"{}\" to report healthy",
            replica_count, variant, service.name
        );
        self.compute
            .wait_for_backends_healthy(service, &backends, replica_count)?;
        Ok(())
    }

    fn resolve_negs<Z: AsRef<str>>(&self, neg_name: &str, zones: &[Z]) -> DirectorResult<Vec<NegRef>> {
        let mut negs = Vec::with_capacity(zones.len());
        for zone in zones {
            let zone = zone.as_ref();
            debug!("Waiting for NEG \"{}\" in zone {}", neg_name, zone);
            negs.push(self.compute.wait_for_network_endpoint_group(neg_name, zone)?);
        }
        Ok(negs)
    }

    // ---------------------------------------------------------------------
    // Routing maps
    // ---------------------------------------------------------------------

    fn url_map_body(&self, name: String, host: &str, port: u16, service: &ResourceRef) -> UrlMapBody {
        UrlMapBody::single_service(
            name,
            self.naming.name_for(PATH_MATCHER_BASE_NAME),
            vec![format!("{host}:{port}")],
            service.url.clone(),
        )
    }

    /// Route `host:port` to the default backend service
    pub fn create_url_map(&mut self, host: &str, port: u16) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::UrlMap;
        self.registry.ensure_absent(kind)?;
        let service = self.registry.require(ResourceKind::BackendService, kind)?;

        let body = self.url_map_body(self.resource_name(kind), host, port, service);
        info!("Creating {} \"{}\" for {}:{}", kind, body.name, host, port);
        let resource = self.compute.create_url_map(&body)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Create an arbitrary caller-built routing map into the default slot
    pub fn create_url_map_with_content(&mut self, body: &UrlMapBody) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::UrlMap;
        self.registry.ensure_absent(kind)?;

        info!("Creating {} \"{}\" with custom content", kind, body.name);
        let resource = self.compute.create_url_map(body)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Point the default routing map at `backend_service`
    pub fn patch_url_map(
        &self,
        host: &str,
        port: u16,
        backend_service: &ResourceRef,
    ) -> DirectorResult<()> {
        let kind = ResourceKind::UrlMap;
        let url_map = self
            .registry
            .get(kind)
            .ok_or_else(|| DirectorError::not_created(kind))?;

        let body = self.url_map_body(url_map.name.clone(), host, port, backend_service);
        info!(
            "Patching {} \"{}\" to route {}:{} to \"{}\"",
            kind, url_map.name, host, port, backend_service.name
        );
        self.compute.patch_url_map(url_map, &body)?;
        Ok(())
    }

    /// Route `host:port` to `backend_service`, or to the alternative backend service
    pub fn create_alternative_url_map(
        &mut self,
        host: &str,
        port: u16,
        backend_service: Option<&ResourceRef>,
    ) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::AlternativeUrlMap;
        self.registry.ensure_absent(kind)?;
        let service = match backend_service {
            Some(service) => service,
            None => self
                .registry
                .require(ResourceKind::AlternativeBackendService, kind)?,
        };

        let body = self.url_map_body(self.resource_name(kind), host, port, service);
        info!("Creating {} \"{}\" for {}:{}", kind, body.name, host, port);
        let resource = self.compute.create_url_map(&body)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    pub fn delete_url_map(&mut self, force: bool) -> DirectorResult<bool> {
        self.delete_url_map_kind(ResourceKind::UrlMap, force)
    }

    pub fn delete_alternative_url_map(&mut self, force: bool) -> DirectorResult<bool> {
        self.delete_url_map_kind(ResourceKind::AlternativeUrlMap, force)
    }

    fn delete_url_map_kind(&mut self, kind: ResourceKind, force: bool) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(kind, force, &self.naming, |name| compute.delete_url_map(name))
    }

    // ---------------------------------------------------------------------
    // Target proxies
    // ---------------------------------------------------------------------

    /// Create the proxy kind matching the default backend protocol
    ///
    /// GRPC backends get a GRPC proxy validated for proxyless clients, HTTP2
    /// backends get an HTTP proxy.
    pub fn create_target_proxy(&mut self) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::TargetProxy;
        let is_http = match self.pools.protocol(BackendVariant::Default) {
            BackendProtocol::Grpc => false,
            BackendProtocol::Http2 => true,
            other => {
                return Err(DirectorError::config(format!(
                    "Unexpected backend service protocol: {other}"
                )))
            }
        };
        self.registry.ensure_absent(kind)?;
        let url_map = self.registry.require(ResourceKind::UrlMap, kind)?;

        let name = self.resource_name(kind);
        let resource = if is_http {
            info!("Creating target HTTP proxy \"{}\" to {} \"{}\"", name, ResourceKind::UrlMap, url_map.name);
            self.compute.create_target_http_proxy(&name, url_map)?
        } else {
            info!("Creating target GRPC proxy \"{}\" to {} \"{}\"", name, ResourceKind::UrlMap, url_map.name);
            self.compute.create_target_grpc_proxy(&name, url_map, true)?
        };

        self.registry.insert(kind, resource.clone())?;
        self.target_proxy_is_http = is_http;
        Ok(resource)
    }

    /// IPv6 proxy; only the HTTP-kind path exists
    pub fn create_target_proxy_ipv6(&mut self) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::TargetProxyIpv6;
        self.registry.ensure_absent(kind)?;
        let url_map = self.registry.require(ResourceKind::UrlMap, kind)?;

        let name = self.resource_name(kind);
        info!("Creating target HTTP proxy \"{}\" to {} \"{}\"", name, ResourceKind::UrlMap, url_map.name);
        let resource = self.compute.create_target_http_proxy(&name, url_map)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// GRPC proxy to the alternative routing map, without proxyless validation
    pub fn create_alternative_target_proxy(&mut self) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::AlternativeTargetProxy;
        let protocol = self.pools.protocol(BackendVariant::Default);
        if protocol != BackendProtocol::Grpc {
            return Err(DirectorError::config(format!(
                "Alternative target proxy requires a GRPC backend service, got {protocol}"
            )));
        }
        self.registry.ensure_absent(kind)?;
        let url_map = self.registry.require(ResourceKind::AlternativeUrlMap, kind)?;

        let name = self.resource_name(kind);
        info!(
            "Creating alternative target GRPC proxy \"{}\" to {} \"{}\"",
            name,
            ResourceKind::AlternativeUrlMap,
            url_map.name
        );
        let resource = self.compute.create_target_grpc_proxy(&name, url_map, false)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Delete the default proxy if it is GRPC-kind
    ///
    /// With `force` the delete is attempted whatever kind was tracked.
    pub fn delete_target_grpc_proxy(&mut self, force: bool) -> DirectorResult<bool> {
        if !force && self.target_proxy_is_http {
            return Ok(false);
        }
        let compute = &self.compute;
        self.registry
            .delete_with(ResourceKind::TargetProxy, force, &self.naming, |name| {
                compute.delete_target_grpc_proxy(name)
            })
    }

    /// Delete the default proxy if it is HTTP-kind
    pub fn delete_target_http_proxy(&mut self, force: bool) -> DirectorResult<bool> {
        if !force && !self.target_proxy_is_http {
            return Ok(false);
        }
        let compute = &self.compute;
        let deleted = self
            .registry
            .delete_with(ResourceKind::TargetProxy, force, &self.naming, |name| {
                compute.delete_target_http_proxy(name)
            })?;
        if deleted {
            self.target_proxy_is_http = false;
        }
        Ok(deleted)
    }

    pub fn delete_target_proxy_ipv6(&mut self, force: bool) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(ResourceKind::TargetProxyIpv6, force, &self.naming, |name| {
                compute.delete_target_http_proxy(name)
            })
    }

    pub fn delete_alternative_target_proxy(&mut self, force: bool) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(ResourceKind::AlternativeTargetProxy, force, &self.naming, |name| {
                compute.delete_target_grpc_proxy(name)
            })
    }

    // ---------------------------------------------------------------------
    // Forwarding rules
    // ---------------------------------------------------------------------

    /// Sample ports uniformly in `[lo, hi]` until one is unused
    pub fn find_unused_forwarding_rule_port(&self, search: PortSearch) -> DirectorResult<u16> {
        self.find_unused_forwarding_rule_port_with(&mut rand::thread_rng(), search)
    }

    pub fn find_unused_forwarding_rule_port_with<R: Rng>(
        &self,
        rng: &mut R,
        search: PortSearch,
    ) -> DirectorResult<u16> {
        let PortSearch { lo, hi, attempts } = search;
        if lo > hi {
            return Err(DirectorError::config(format!(
                "Invalid port range [{lo}, {hi}]"
            )));
        }

        for _ in 0..attempts {
            let port = rng.gen_range(lo..=hi);
            if !self.compute.exists_forwarding_rule(port)? {
                debug!("Found unused forwarding rule port {}", port);
                return Ok(port);
            }
        }
        Err(DirectorError::PortsExhausted { lo, hi, attempts })
    }

    /// Bind `0.0.0.0:src_port` to the default target proxy
    pub fn create_forwarding_rule(&mut self, src_port: u16) -> DirectorResult<ResourceRef> {
        self.create_forwarding_rule_kind(
            ResourceKind::ForwardingRule,
            ResourceKind::TargetProxy,
            src_port,
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        )
    }

    /// Bind `[::]:src_port` to the IPv6 target proxy
    pub fn create_forwarding_rule_ipv6(&mut self, src_port: u16) -> DirectorResult<ResourceRef> {
        self.create_forwarding_rule_kind(
            ResourceKind::ForwardingRuleIpv6,
            ResourceKind::TargetProxyIpv6,
            src_port,
            IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        )
    }

    /// Bind the alternative target proxy; `None` address means `0.0.0.0`
    pub fn create_alternative_forwarding_rule(
        &mut self,
        src_port: u16,
        ip_address: Option<IpAddr>,
    ) -> DirectorResult<ResourceRef> {
        self.create_forwarding_rule_kind(
            ResourceKind::AlternativeForwardingRule,
            ResourceKind::AlternativeTargetProxy,
            src_port,
            ip_address.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        )
    }

    fn create_forwarding_rule_kind(
        &mut self,
        kind: ResourceKind,
        proxy_kind: ResourceKind,
        src_port: u16,
        ip_address: IpAddr,
    ) -> DirectorResult<ResourceRef> {
        self.registry.ensure_absent(kind)?;
        let proxy = self.registry.require(proxy_kind, kind)?;

        let spec = ForwardingRuleSpec {
            name: self.resource_name(kind),
            port: src_port,
            target: proxy.url.clone(),
            network: self.config.network_url(),
            ip_address,
        };
        info!(
            "Creating {} \"{}\" in network \"{}\": {}:{} -> {}",
            kind, spec.name, self.config.network, ip_address, src_port, proxy.name
        );
        let resource = self.compute.create_forwarding_rule(&spec)?;

        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    pub fn delete_forwarding_rule(&mut self, force: bool) -> DirectorResult<bool> {
        self.delete_forwarding_rule_kind(ResourceKind::ForwardingRule, force)
    }

    pub fn delete_forwarding_rule_ipv6(&mut self, force: bool) -> DirectorResult<bool> {
        self.delete_forwarding_rule_kind(ResourceKind::ForwardingRuleIpv6, force)
    }

    pub fn delete_alternative_forwarding_rule(&mut self, force: bool) -> DirectorResult<bool> {
        self.delete_forwarding_rule_kind(ResourceKind::AlternativeForwardingRule, force)
    }

    fn delete_forwarding_rule_kind(&mut self, kind: ResourceKind, force: bool) -> DirectorResult<bool> {
        let compute = &self.compute;
        self.registry
            .delete_with(kind, force, &self.naming, |name| compute.delete_forwarding_rule(name))
    }

    // ---------------------------------------------------------------------
    // Firewall rules
    // ---------------------------------------------------------------------

    /// Allow health-check traffic from each non-empty source range
    pub fn create_firewall_rules(
        &mut self,
        allowed_ports: &[String],
        source_range: Option<&str>,
        source_range_ipv6: Option<&str>,
    ) -> DirectorResult<()> {
        let ranges = [
            (ResourceKind::FirewallRule, source_range),
            (ResourceKind::FirewallRuleIpv6, source_range_ipv6),
        ];
        for (kind, range) in ranges {
            let Some(range) = range.filter(|range| !range.is_empty()) else {
                continue;
            };
            self.registry.ensure_absent(kind)?;

            let spec = FirewallRuleSpec {
                name: self.resource_name(kind),
                network: self.config.network_url(),
                source_range: range.to_string(),
                allowed_ports: allowed_ports.to_vec(),
            };
            info!(
                "Creating {} \"{}\" from {} to ports {:?}",
                kind, spec.name, range, allowed_ports
            );
            let resource = self.compute.create_firewall_rule(&spec)?;

            self.registry.insert(kind, resource)?;
            self.firewall_in_use = true;
        }
        Ok(())
    }

    /// Best-effort removal of both firewall rules
    ///
    /// Failures are logged and leave their slot `Present`, so the flag stays
    /// set and a later cleanup tries again.
    pub fn delete_firewall_rules(&mut self, force: bool) {
        if !self.firewall_in_use {
            return;
        }
        self.delete_firewall_rule(ResourceKind::FirewallRule, force);
        self.delete_firewall_rule(ResourceKind::FirewallRuleIpv6, force);
        self.firewall_in_use = self.registry.is_present(ResourceKind::FirewallRule)
            || self.registry.is_present(ResourceKind::FirewallRuleIpv6);
    }

    fn delete_firewall_rule(&mut self, kind: ResourceKind, force: bool) -> bool {
        let compute = &self.compute;
        match self
            .registry
            .delete_with(kind, force, &self.naming, |name| compute.delete_firewall_rule(name))
        {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!("Failed deleting {}: {}", kind, err);
                false
            }
        }
    }
}
