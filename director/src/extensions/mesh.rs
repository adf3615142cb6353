//! Mesh and route resources
//!
//! Routes attach to the mesh and forward to a backend service owned by the
//! base orchestrator, so this layer is torn down before the base.

use tracing::{debug, info};

use shared::{bodies::RouteRule, GrpcRouteBody, HttpRouteBody, MeshBody, ResourceRef};

use super::{CleanupPlan, Extension};
use crate::{
    core::{BackendVariant, NamingPolicy, ResourceKind, ResourceRegistry},
    traffic_director::TrafficDirector,
    error::{DirectorError, DirectorResult},
    traits::{ComputeGateway, NetworkServicesGateway},
};

/// Collection name used to qualify backend service references in routes
const BACKEND_SERVICES_COLLECTION: &str = "backendServices";

pub struct MeshRouting<S: NetworkServicesGateway> {
    netsvc: S,
    naming: NamingPolicy,
    registry: ResourceRegistry,
}

impl<S: NetworkServicesGateway> MeshRouting<S> {
    pub fn new(netsvc: S, naming: NamingPolicy) -> Self {
        Self {
            netsvc,
            naming,
            registry: ResourceRegistry::new(&ResourceKind::MESH),
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceRef> {
        self.registry.get(kind)
    }

    pub fn create_mesh(&mut self) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::Mesh;
        self.registry.ensure_absent(kind)?;

        let name = self.naming.name_for(kind.base_name());
        info!("Creating {} \"{}\"", kind, name);
        self.netsvc.create_mesh(&name, &MeshBody::default())?;

        let resource = self.netsvc.get_mesh(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    /// Route `host:port` inside the mesh to the base's default backend service
    pub fn create_grpc_route<C: ComputeGateway>(
        &mut self,
        base: &TrafficDirector<C>,
        host: &str,
        port: u16,
    ) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::GrpcRoute;
        self.registry.ensure_absent(kind)?;
        let mesh = self.registry.require(ResourceKind::Mesh, kind)?;
        let backend = base
            .backend_service(BackendVariant::Default)
            .ok_or_else(|| DirectorError::missing(kind, ResourceKind::BackendService))?;

        let service_name = self
            .netsvc
            .resource_full_name(&backend.name, BACKEND_SERVICES_COLLECTION);
        let body = GrpcRouteBody {
            meshes: vec![mesh.url.clone()],
            hostnames: vec![format!("{host}:{port}")],
            rules: vec![RouteRule::forward_to(service_name)],
        };
        self.create_grpc_route_with_content(&body)
    }

    pub fn create_grpc_route_with_content(&mut self, body: &GrpcRouteBody) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::GrpcRoute;
        self.registry.ensure_absent(kind)?;

        let name = self.naming.name_for(kind.base_name());
        info!("Creating {} \"{}\" for {:?}", kind, name, body.hostnames);
        self.netsvc.create_grpc_route(&name, body)?;

        let resource = self.netsvc.get_grpc_route(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    pub fn create_http_route_with_content(&mut self, body: &HttpRouteBody) -> DirectorResult<ResourceRef> {
        let kind = ResourceKind::HttpRoute;
        self.registry.ensure_absent(kind)?;

        let name = self.naming.name_for(kind.base_name());
        info!("Creating {} \"{}\" for {:?}", kind, name, body.hostnames);
        self.netsvc.create_http_route(&name, body)?;

        let resource = self.netsvc.get_http_route(&name)?;
        debug!("Loaded {} \"{}\": {}", kind, name, resource.url);
        self.registry.insert(kind, resource.clone())?;
        Ok(resource)
    }

    pub fn delete_mesh(&mut self, force: bool) -> DirectorResult<bool> {
        let netsvc = &self.netsvc;
        self.registry
            .delete_with(ResourceKind::Mesh, force, &self.naming, |name| netsvc.delete_mesh(name))
    }

    pub fn delete_grpc_route(&mut self, force: bool) -> DirectorResult<bool> {
        let netsvc = &self.netsvc;
        self.registry
            .delete_with(ResourceKind::GrpcRoute, force, &self.naming, |name| {
                netsvc.delete_grpc_route(name)
            })
    }

    pub fn delete_http_route(&mut self, force: bool) -> DirectorResult<bool> {
        let netsvc = &self.netsvc;
        self.registry
            .delete_with(ResourceKind::HttpRoute, force, &self.naming, |name| {
                netsvc.delete_http_route(name)
            })
    }
}

impl<S: NetworkServicesGateway> Extension for MeshRouting<S> {
    fn register_teardown(&self, plan: &mut CleanupPlan) {
        plan.run_before_base();
    }

    fn teardown(&mut self, force: bool) -> DirectorResult<()> {
        self.delete_http_route(force)?;
        self.delete_grpc_route(force)?;
        self.delete_mesh(force)?;
        Ok(())
    }

    fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }
}
