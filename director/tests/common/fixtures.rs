//! Test fixtures and data for director tests

use director::DirectorConfig;
use shared::{NegRef, ResourceRef};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const PROJECT: &'static str = "test-project";
    pub const PREFIX: &'static str = "td";
    pub const SUFFIX: &'static str = "s1";

    /// Service the routing map exposes
    pub const HOST: &'static str = "svc.example";
    pub const PORT: u16 = 8080;

    pub const NEG_NAME: &'static str = "server-neg";
    pub const ZONE_A: &'static str = "us-central1-a";
    pub const ZONE_B: &'static str = "us-central1-b";

    pub const NAMESPACE: &'static str = "psm";
    pub const SERVER_NAME: &'static str = "psm-grpc-server";

    pub fn config() -> DirectorConfig {
        DirectorConfig::new(Self::PROJECT, Self::PREFIX).with_suffix(Self::SUFFIX)
    }

    /// `{prefix}-{base}-{suffix}` for the standard config
    pub fn name(base: &str) -> String {
        format!("{}-{}-{}", Self::PREFIX, base, Self::SUFFIX)
    }

    pub fn compute_ref(collection: &str, name: &str) -> ResourceRef {
        ResourceRef::new(
            name,
            format!(
                "https://compute.googleapis.com/compute/v1/projects/{}/global/{}/{}",
                Self::PROJECT,
                collection,
                name
            ),
            collection,
        )
    }

    pub fn located_ref(collection: &str, name: &str) -> ResourceRef {
        ResourceRef::new(
            name,
            format!("projects/{}/locations/global/{}/{}", Self::PROJECT, collection, name),
            collection,
        )
    }

    pub fn neg(zone: &str) -> NegRef {
        NegRef::new(
            Self::NEG_NAME,
            zone,
            format!(
                "projects/{}/zones/{}/networkEndpointGroups/{}",
                Self::PROJECT,
                zone,
                Self::NEG_NAME
            ),
        )
    }
}
