//! Dependency-ordered lifecycle orchestration for Traffic Director resources
//!
//! The base `TrafficDirector` provisions health checks, backend services,
//! routing maps, proxies, forwarding and firewall rules in dependency order
//! and tears them down in reverse. Mesh routing and security policies layer
//! on top through `Layered`. All remote effects go through the gateway
//! traits, so the sequencing runs unchanged against mocks, the in-memory
//! plane or a live control plane.

pub mod config;
pub mod core;
pub mod error;
pub mod extensions;
pub mod services;
pub mod traffic_director;
pub mod traits;

// Re-export commonly used types
pub use config::DirectorConfig;
pub use core::{BackendVariant, Deletion, NamingPolicy, ResourceKind, ResourceRegistry, Slot};
pub use error::{DirectorError, DirectorResult};
pub use traffic_director::{PortSearch, TrafficDirector, AFFINITY_METADATA_KEY};
pub use extensions::{
    CleanupPlan, Extension, Layered, MeshDirector, MeshRouting, SecureDirector, SecurityPolicies,
    Stage,
};
pub use services::InMemoryControlPlane;
pub use traits::{ComputeGateway, NetworkSecurityGateway, NetworkServicesGateway};
pub use traits::{MockComputeGateway, MockNetworkSecurityGateway, MockNetworkServicesGateway};
