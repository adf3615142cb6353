//! TLS, authorization and endpoint policies
//!
//! The default backend service gets patched to reference the client TLS
//! policy, so base cleanup has to run before these policies are removed.

use tracing::{debug, info, warn};

use shared::{
    bodies::{
        EndpointMatcher, EndpointPolicyType, MetadataLabel, MetadataLabelMatcher, MtlsPolicy,
        PortSelector,
    },
    AuthorizationPolicyBody, AuthzAction, AuthzRule, BackendServicePatch, CertificateProvider,
    ClientTlsPolicyBody, EndpointPolicyBody, ResourceRef, SecuritySettings, ServerTlsPolicyBody,
};

use super::{CleanupPlan, Extension};
use crate::{
    core::{BackendVariant, NamingPolicy, ResourceKind, ResourceRegistry},
    traffic_director::TrafficDirector,
    error::DirectorResult,
    traits::{ComputeGateway, NetworkSecurityGateway, NetworkServicesGateway},
};

/// Certificate provider plugin backing every TLS policy
pub const CERTIFICATE_PROVIDER_INSTANCE: &str = "google_cloud_private_spiffe";

/// Workload identity of a Kubernetes service account
pub fn spiffe_id(project: &str, namespace: &str, service_account: &str) -> String {
    format!("spiffe://{project}.svc.id.goog/ns/{namespace}/sa/{service_account}")
}

pub struct SecurityPolicies<N: NetworkSecurityGateway, S: NetworkServicesGateway> {
    netsec: N,
    netsvc: S,
    naming: NamingPolicy,
    registry: ResourceRegistry,
}

impl<N, S> SecurityPolicies<N, S>
where
    N: NetworkSecurityGateway,
    S: NetworkServicesGateway,
{
    pub fn new(netsec: N, netsvc: S, naming: NamingPolicy) -> Self {
        Self {
            netsec,
            netsvc,
            naming,
            registry: ResourceRegistry::new(&ResourceKind::SECURITY),
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceRef> {
        self.registry.get(kind)
    }

    fn name(&self, kind: ResourceKind) -> String {
        self.naming.name_for(kind.base_name())
    }

    fn provider() -> CertificateProvider {
        CertificateProvider::plugin(CERTIFICATE_PROVIDER_INSTANCE)
    }

    /// Server TLS policy, then an endpoint policy attaching it
    pub fn setup_server_security(
        &mut self,
        namespace: &str,
        name: &str,
        port: u16,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<()> {
        self.create_server_tls_policy(tls, mtls)?;
        self.create_endpoint_policy(namespace, name, port)?;
        Ok(())
    }

    /// Client TLS policy, then the backend service patch referencing it
    pub fn setup_client_security<C: ComputeGateway>(
        &mut self,
        base: &TrafficDirector<C>,
        namespace: &str,
        name: &str,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<()> {
        self.create_client_tls_policy(tls, mtls)?;
        self.apply_client_mtls_policy(base, namespace, name)?;
        Ok(())
    }

    /// Create the server TLS policy
    ///
    /// With both `tls` and `mtls` off there is nothing to configure: a
    /// warning is logged and `Ok(None)` returned without touching the slot.
    pub fn create_server_tls_policy(
        &mut self,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<Option<ResourceRef>> {
        let kind = ResourceKind::ServerTlsPolicy;
        if !tls && !mtls {
            warn!("{} not created: server TLS and mTLS are both disabled", kind);
            return Ok(None);
        }
        self.registry.ensure_absent(kind)?;

        let mut body = ServerTlsPolicyBody::default();
        if tls {
            body.server_certificate = Some(Self::provider());
        }
        if mtls {
            body.mtls_policy = Some(MtlsPolicy {
                client_validation_ca: vec![Self::provider()],
            });
        }

        let name = self.name(kind);
        info!("Creating {} \"{}\" (tls={}, mtls={})", kind, name, tls, mtls);
        self.netsec.create_server_tls_policy(&name, &body)?;

        let resource = self.netsec.get_server_tls_policy(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(Some(resource))
    }

    /// Create the client TLS policy
    ///
    /// Skipped with a warning when both `tls` and `mtls` are off, like the
    /// server policy.
    pub fn create_client_tls_policy(
        &mut self,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<Option<ResourceRef>> {
        let kind = ResourceKind::ClientTlsPolicy;
        if !tls && !mtls {
            warn!("{} not created: client TLS and mTLS are both disabled", kind);
            return Ok(None);
        }
        self.registry.ensure_absent(kind)?;

        let mut body = ClientTlsPolicyBody::default();
        if tls {
            body.server_validation_ca = vec![Self::provider()];
        }
        if mtls {
            body.client_certificate = Some(Self::provider());
        }

        let name = self.name(kind);
        info!("Creating {} \"{}\" (tls={}, mtls={})", kind, name, tls, mtls);
        self.netsec.create_client_tls_policy(&name, &body)?;

        let resource = self.netsec.get_client_tls_policy(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(Some(resource))
    }

    pub fn create_authz_policy(
        &mut self,
        action: AuthzAction,
        rules: Vec<AuthzRule>,
    ) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::AuthorizationPolicy;
        self.registry.ensure_absent(kind)?;

        let body = AuthorizationPolicyBody { action, rules };
        let name = self.name(kind);
        info!("Creating {} \"{}\" with {} rules", kind, name, body.rules.len());
        self.netsec.create_authz_policy(&name, &body)?;

        let resource = self.netsec.get_authz_policy(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Endpoint policy for workloads labelled `app={namespace}-{name}`
    ///
    /// Attaches the server TLS and authorization policies when they exist.
    pub fn create_endpoint_policy(
        &mut self,
        namespace: &str,
        name: &str,
        port: u16,
    ) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::EndpointPolicy;
        self.registry.ensure_absent(kind)?;

        let server_tls_policy = self.registry.get(ResourceKind::ServerTlsPolicy);
        if server_tls_policy.is_none() {
            warn!(
                "{} created without a {}: none was created",
                kind,
                ResourceKind::ServerTlsPolicy
            );
        }

        let body = EndpointPolicyBody {
            policy_type: EndpointPolicyType::GrpcServer,
            traffic_port_selector: PortSelector {
                ports: vec![port.to_string()],
            },
            endpoint_matcher: EndpointMatcher {
                metadata_label_matcher: MetadataLabelMatcher {
                    metadata_label_match_criteria: "MATCH_ALL".to_string(),
                    metadata_labels: vec![MetadataLabel {
                        label_name: "app".to_string(),
                        label_value: format!("{namespace}-{name}"),
                    }],
                },
            },
            server_tls_policy: server_tls_policy.map(|policy| policy.name.clone()),
            authorization_policy: self
                .registry
                .get(ResourceKind::AuthorizationPolicy)
                .map(|policy| policy.name.clone()),
        };

        let policy_name = self.name(kind);
        info!("Creating {} \"{}\" for app {}-{} on port {}", kind, policy_name, namespace, name, port);
        self.netsvc.create_endpoint_policy(&policy_name, &body)?;

        let resource = self.netsvc.get_endpoint_policy(&policy_name)?;
        debug!("Loaded {} \"{}\": {}", kind, policy_name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Patch the base's default backend service to use the client TLS policy
    ///
    /// Returns `Ok(false)` without any remote call when no client TLS policy
    /// has been created.
    pub fn apply_client_mtls_policy<C: ComputeGateway>(
        &self,
        base: &TrafficDirector<C>,
        namespace: &str,
        name: &str,
    ) -> DirectorResult<bool> {
        let Some(client_policy) = self.registry.get(ResourceKind::ClientTlsPolicy) else {
            warn!(
                "Backend service security not patched: {} has not been created",
                ResourceKind::ClientTlsPolicy
            );
            return Ok(false);
        };

        let patch = BackendServicePatch {
            security_settings: Some(SecuritySettings {
                client_tls_policy: client_policy.url.clone(),
                subject_alt_names: vec![spiffe_id(base.project(), namespace, name)],
            }),
        };
        base.patch_backend_service(BackendVariant::Default, &patch)?;
        Ok(true)
    }

    pub fn delete_server_tls_policy(&mut self, force: bool) -> DirectorResult<bool> {
        let netsec = &self.netsec;
        self.registry
            .delete_with(ResourceKind::ServerTlsPolicy, force, &self.naming, |name| {
                netsec.delete_server_tls_policy(name)
            })
    }

    pub fn delete_client_tls_policy(&mut self, force: bool) -> DirectorResult<bool> {
        let netsec = &self.netsec;
        self.registry
            .delete_with(ResourceKind::ClientTlsPolicy, force, &self.naming, |name| {
                netsec.delete_client_tls_policy(name)
            })
    }

    pub fn delete_authz_policy(&mut self, force: bool) -> DirectorResult<bool> {
        let netsec = &self.netsec;
        self.registry
            .delete_with(ResourceKind::AuthorizationPolicy, force, &self.naming, |name| {
                netsec.delete_authz_policy(name)
            })
    }

    pub fn delete_endpoint_policy(&mut self, force: bool) -> DirectorResult<bool> {
        let netsvc = &self.netsvc;
        self.registry
            .delete_with(ResourceKind::EndpointPolicy, force, &self.naming, |name| {
                netsvc.delete_endpoint_policy(name)
            })
    }
}

impl<N, S> Extension for SecurityPolicies<N, S>
where
    N: NetworkSecurityGateway,
    S: NetworkServicesGateway,
{
    fn register_teardown(&self, plan: &mut CleanupPlan) {
        plan.run_after_base();
    }

    fn teardown(&mut self, force: bool) -> DirectorResult<()> {
        self.delete_endpoint_policy(force)?;
        self.delete_server_tls_policy(force)?;
        self.delete_client_tls_policy(force)?;
        self.delete_authz_policy(force)?;
        Ok(())
    }

    fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }
}
