//! Typed registry of managed resource slots
//!
//! Every managed resource kind owns exactly one slot holding either
//! `Absent` or `Present(handle)`. The base orchestrator and each extension
//! own a registry covering only their own kinds.

use serde::{Deserialize, Serialize};
use shared::{GatewayResult, ResourceRef};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use super::NamingPolicy;
use crate::error::{DirectorError, DirectorResult};

/// Every resource kind the orchestrator can manage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    HealthCheck,
    BackendService,
    AlternativeBackendService,
    AffinityBackendService,
    UrlMap,
    AlternativeUrlMap,
    TargetProxy,
    TargetProxyIpv6,
    AlternativeTargetProxy,
    ForwardingRule,
    ForwardingRuleIpv6,
    AlternativeForwardingRule,
    FirewallRule,
    FirewallRuleIpv6,
    Mesh,
    GrpcRoute,
    HttpRoute,
    ServerTlsPolicy,
    ClientTlsPolicy,
    AuthorizationPolicy,
    EndpointPolicy,
}

impl ResourceKind {
    /// Kinds owned by the base orchestrator
    pub const BASE: [ResourceKind; 14] = [
        ResourceKind::HealthCheck,
        ResourceKind::BackendService,
        ResourceKind::AlternativeBackendService,
        ResourceKind::AffinityBackendService,
        ResourceKind::UrlMap,
        ResourceKind::AlternativeUrlMap,
        ResourceKind::TargetProxy,
        ResourceKind::TargetProxyIpv6,
        ResourceKind::AlternativeTargetProxy,
        ResourceKind::ForwardingRule,
        ResourceKind::ForwardingRuleIpv6,
        ResourceKind::AlternativeForwardingRule,
        ResourceKind::FirewallRule,
        ResourceKind::FirewallRuleIpv6,
    ];

    pub const MESH: [ResourceKind; 3] = [
        ResourceKind::Mesh,
        ResourceKind::GrpcRoute,
        ResourceKind::HttpRoute,
    ];

    pub const SECURITY: [ResourceKind; 4] = [
        ResourceKind::ServerTlsPolicy,
        ResourceKind::ClientTlsPolicy,
        ResourceKind::AuthorizationPolicy,
        ResourceKind::EndpointPolicy,
    ];

    /// Fixed base name fed into the naming policy
    pub fn base_name(&self) -> &'static str {
        match self {
            ResourceKind::HealthCheck => "health-check",
            ResourceKind::BackendService => "backend-service",
            ResourceKind::AlternativeBackendService => "backend-service-alt",
            ResourceKind::AffinityBackendService => "backend-service-affinity",
            ResourceKind::UrlMap => "url-map",
            ResourceKind::AlternativeUrlMap => "url-map-alt",
            ResourceKind::TargetProxy => "target-proxy",
            ResourceKind::TargetProxyIpv6 => "target-proxy-ipv6",
            ResourceKind::AlternativeTargetProxy => "target-proxy-alt",
            ResourceKind::ForwardingRule => "forwarding-rule",
            ResourceKind::ForwardingRuleIpv6 => "forwarding-rule-ipv6",
            ResourceKind::AlternativeForwardingRule => "forwarding-rule-alt",
            ResourceKind::FirewallRule => "allow-health-checks",
            ResourceKind::FirewallRuleIpv6 => "allow-health-checks-ipv6",
            ResourceKind::Mesh => "mesh",
            ResourceKind::GrpcRoute => "grpc-route",
            ResourceKind::HttpRoute => "http-route",
            ResourceKind::ServerTlsPolicy => "server-tls-policy",
            ResourceKind::ClientTlsPolicy => "client-tls-policy",
            ResourceKind::AuthorizationPolicy => "authz-policy",
            ResourceKind::EndpointPolicy => "endpoint-policy",
        }
    }

    /// Human-readable label used in logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::HealthCheck => "Health Check",
            ResourceKind::BackendService => "Backend Service",
            ResourceKind::AlternativeBackendService => "Alternative Backend Service",
            ResourceKind::AffinityBackendService => "Affinity Backend Service",
            ResourceKind::UrlMap => "URL Map",
            ResourceKind::AlternativeUrlMap => "Alternative URL Map",
            ResourceKind::TargetProxy => "Target Proxy",
            ResourceKind::TargetProxyIpv6 => "IPv6 Target Proxy",
            ResourceKind::AlternativeTargetProxy => "Alternative Target Proxy",
            ResourceKind::ForwardingRule => "Forwarding Rule",
            ResourceKind::ForwardingRuleIpv6 => "IPv6 Forwarding Rule",
            ResourceKind::AlternativeForwardingRule => "Alternative Forwarding Rule",
            ResourceKind::FirewallRule => "Firewall Rule",
            ResourceKind::FirewallRuleIpv6 => "IPv6 Firewall Rule",
            ResourceKind::Mesh => "Mesh",
            ResourceKind::GrpcRoute => "GrpcRoute",
            ResourceKind::HttpRoute => "HttpRoute",
            ResourceKind::ServerTlsPolicy => "Server TLS Policy",
            ResourceKind::ClientTlsPolicy => "Client TLS Policy",
            ResourceKind::AuthorizationPolicy => "Authz Policy",
            ResourceKind::EndpointPolicy => "Endpoint Policy",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of one managed resource
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    Absent,
    Present(ResourceRef),
}

impl Slot {
    pub fn resource(&self) -> Option<&ResourceRef> {
        match self {
            Slot::Absent => None,
            Slot::Present(resource) => Some(resource),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }
}

/// Name a delete call should target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Name read from a `Present` slot
    Tracked(String),
    /// Name recomputed from the naming tuple, regardless of slot state
    Forced(String),
}

impl Deletion {
    pub fn name(&self) -> &str {
        match self {
            Deletion::Tracked(name) | Deletion::Forced(name) => name,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Deletion::Forced(_))
    }
}

static ABSENT: Slot = Slot::Absent;

#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    slots: BTreeMap<ResourceKind, Slot>,
}

impl ResourceRegistry {
    /// Registry owning the given kinds, all starting `Absent`
    pub fn new(kinds: &[ResourceKind]) -> Self {
        Self {
            slots: kinds.iter().map(|kind| (*kind, Slot::Absent)).collect(),
        }
    }

    pub fn slot(&self, kind: ResourceKind) -> &Slot {
        self.slots.get(&kind).unwrap_or(&ABSENT)
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceRef> {
        self.slot(kind).resource()
    }

    pub fn is_present(&self, kind: ResourceKind) -> bool {
        self.slot(kind).is_present()
    }

    /// Fails if `kind` already holds a resource
    pub fn ensure_absent(&self, kind: ResourceKind) -> DirectorResult<()> {
        match self.slot(kind) {
            Slot::Absent => Ok(()),
            Slot::Present(resource) => Err(DirectorError::AlreadyExists {
                kind,
                name: resource.name.clone(),
            }),
        }
    }

    /// Resource in `requires`, or a missing-dependency error for `kind`
    pub fn require(&self, requires: ResourceKind, kind: ResourceKind) -> DirectorResult<&ResourceRef> {
        self.get(requires)
            .ok_or_else(|| DirectorError::missing(kind, requires))
    }

    /// Transition `kind` from `Absent` to `Present`
    pub fn insert(&mut self, kind: ResourceKind, resource: ResourceRef) -> DirectorResult<()> {
        self.ensure_absent(kind)?;
        self.slots.insert(kind, Slot::Present(resource));
        Ok(())
    }

    /// Overwrite the slot with a freshly loaded resource
    pub fn replace(&mut self, kind: ResourceKind, resource: ResourceRef) -> Option<ResourceRef> {
        match self.slots.insert(kind, Slot::Present(resource)) {
            Some(Slot::Present(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Transition `kind` back to `Absent`
    pub fn clear(&mut self, kind: ResourceKind) -> Option<ResourceRef> {
        match self.slots.insert(kind, Slot::Absent) {
            Some(Slot::Present(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Resolve which name, if any, a delete of `kind` should target
    ///
    /// Without `force` an `Absent` slot yields `None` and the delete is a
    /// no-op. With `force` the name is always recomputed from `naming`.
    pub fn deletion_target(
        &self,
        kind: ResourceKind,
        force: bool,
        naming: &NamingPolicy,
    ) -> Option<Deletion> {
        if force {
            return Some(Deletion::Forced(naming.name_for(kind.base_name())));
        }
        self.get(kind)
            .map(|resource| Deletion::Tracked(resource.name.clone()))
    }

    /// Delete `kind` remotely through `delete` and return the slot to `Absent`
    ///
    /// Returns `Ok(false)` when nothing was attempted. A remote not-found
    /// reply counts as a successful delete; any other failure leaves the
    /// slot untouched and propagates.
    pub fn delete_with<F>(
        &mut self,
        kind: ResourceKind,
        force: bool,
        naming: &NamingPolicy,
        delete: F,
    ) -> DirectorResult<bool>
    where
        F: FnOnce(&str) -> GatewayResult<()>,
    {
        let Some(target) = self.deletion_target(kind, force, naming) else {
            return Ok(false);
        };

        info!("Deleting {} \"{}\"", kind, target.name());
        match delete(target.name()) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!("{} \"{}\" already gone: {}", kind, target.name(), err);
            }
            Err(err) => return Err(err.into()),
        }
        self.clear(kind);
        Ok(true)
    }

    /// All `Present` slots in kind order
    pub fn present(&self) -> impl Iterator<Item = (ResourceKind, &ResourceRef)> {
        self.slots
            .iter()
            .filter_map(|(kind, slot)| slot.resource().map(|resource| (*kind, resource)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}
