//! Extensions layered on top of the base orchestrator
//!
//! An extension owns its own slice of resource slots and reads the base's
//! state through a shared borrow. `Layered` couples the base with exactly one
//! extension and runs cleanup in the order the extension registered.

pub mod mesh;
pub mod security;

pub use mesh::MeshRouting;
pub use security::SecurityPolicies;

use crate::{
    config::DirectorConfig,
    core::{ResourceKind, ResourceRegistry},
    traffic_director::TrafficDirector,
    error::DirectorResult,
    traits::{ComputeGateway, NetworkSecurityGateway, NetworkServicesGateway},
};
use shared::ResourceRef;

/// One step of a composed cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Base,
    Extension,
}

/// Ordered teardown stages of a composed orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    stages: Vec<Stage>,
}

impl Default for CleanupPlan {
    fn default() -> Self {
        Self {
            stages: vec![Stage::Base],
        }
    }
}

impl CleanupPlan {
    /// Extension resources reference base resources and must go first
    pub fn run_before_base(&mut self) {
        let at = self.base_position();
        self.stages.insert(at, Stage::Extension);
    }

    /// Base resources reference extension resources and must go first
    pub fn run_after_base(&mut self) {
        let at = self.base_position() + 1;
        self.stages.insert(at, Stage::Extension);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn base_position(&self) -> usize {
        self.stages
            .iter()
            .position(|stage| *stage == Stage::Base)
            .unwrap_or(0)
    }
}

/// Additional resource layer composed with a `TrafficDirector`
pub trait Extension {
    /// Declare where this extension's teardown runs relative to the base
    fn register_teardown(&self, plan: &mut CleanupPlan);

    /// Delete every resource this extension owns, in reverse dependency order
    fn teardown(&mut self, force: bool) -> DirectorResult<()>;

    fn registry(&self) -> &ResourceRegistry;
}

/// Base orchestrator plus one extension
pub struct Layered<C: ComputeGateway, E: Extension> {
    base: TrafficDirector<C>,
    extension: E,
    plan: CleanupPlan,
}

pub type MeshDirector<C, S> = Layered<C, MeshRouting<S>>;
pub type SecureDirector<C, N, S> = Layered<C, SecurityPolicies<N, S>>;

impl<C: ComputeGateway, E: Extension> Layered<C, E> {
    pub fn new(base: TrafficDirector<C>, extension: E) -> Self {
        let mut plan = CleanupPlan::default();
        extension.register_teardown(&mut plan);
        Self {
            base,
            extension,
            plan,
        }
    }

    pub fn base(&self) -> &TrafficDirector<C> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut TrafficDirector<C> {
        &mut self.base
    }

    pub fn extension(&self) -> &E {
        &self.extension
    }

    pub fn extension_mut(&mut self) -> &mut E {
        &mut self.extension
    }

    pub fn plan(&self) -> &CleanupPlan {
        &self.plan
    }

    /// Every `Present` slot across base and extension
    pub fn inventory(&self) -> Vec<(ResourceKind, ResourceRef)> {
        self.base
            .registry()
            .present()
            .chain(self.extension.registry().present())
            .map(|(kind, resource)| (kind, resource.clone()))
            .collect()
    }

    /// Walk the registered stages in order, stopping at the first failure
    pub fn cleanup(&mut self, force: bool) -> DirectorResult<()> {
        for stage in self.plan.stages.clone() {
            match stage {
                Stage::Base => self.base.cleanup(force)?,
                Stage::Extension => self.extension.teardown(force)?,
            }
        }
        Ok(())
    }
}

impl<C: ComputeGateway, S: NetworkServicesGateway> Layered<C, MeshRouting<S>> {
    /// Base orchestrator with mesh and route resources
    pub fn with_mesh(compute: C, netsvc: S, config: DirectorConfig) -> Self {
        let base = TrafficDirector::new(compute, config);
        let mesh = MeshRouting::new(netsvc, base.naming().clone());
        Self::new(base, mesh)
    }

    pub fn create_mesh(&mut self) -> DirectorResult<ResourceRef> {
        self.extension.create_mesh()
    }

    /// gRPC route from `host:port` to the base's default backend service
    pub fn create_grpc_route(&mut self, host: &str, port: u16) -> DirectorResult<ResourceRef> {
        self.extension.create_grpc_route(&self.base, host, port)
    }
}

impl<C, N, S> Layered<C, SecurityPolicies<N, S>>
where
    C: ComputeGateway,
    N: NetworkSecurityGateway,
    S: NetworkServicesGateway,
{
    /// Base orchestrator with TLS, authorization and endpoint policies
    pub fn with_security(compute: C, netsec: N, netsvc: S, config: DirectorConfig) -> Self {
        let base = TrafficDirector::new(compute, config);
        let security = SecurityPolicies::new(netsec, netsvc, base.naming().clone());
        Self::new(base, security)
    }

    pub fn setup_server_security(
        &mut self,
        namespace: &str,
        name: &str,
        port: u16,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<()> {
        self.extension
            .setup_server_security(namespace, name, port, tls, mtls)
    }

    pub fn setup_client_security(
        &mut self,
        namespace: &str,
        name: &str,
        tls: bool,
        mtls: bool,
    ) -> DirectorResult<()> {
        self.extension
            .setup_client_security(&self.base, namespace, name, tls, mtls)
    }

    /// Point the default backend service at the client TLS policy
    pub fn apply_client_mtls_policy(&self, namespace: &str, name: &str) -> DirectorResult<bool> {
        self.extension
            .apply_client_mtls_policy(&self.base, namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_base_only() {
        assert_eq!(CleanupPlan::default().stages(), &[Stage::Base]);
    }

    #[test]
    fn test_before_base_plan() {
        let mut plan = CleanupPlan::default();
        plan.run_before_base();
        assert_eq!(plan.stages(), &[Stage::Extension, Stage::Base]);
    }

    #[test]
    fn test_after_base_plan() {
        let mut plan = CleanupPlan::default();
        plan.run_after_base();
        assert_eq!(plan.stages(), &[Stage::Base, Stage::Extension]);
    }
}
