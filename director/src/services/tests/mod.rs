//! Service-specific tests

mod in_memory;

/// Shared fixtures for service tests
pub mod common {
    use crate::services::InMemoryControlPlane;

    pub const TEST_PROJECT: &str = "test-project";
    pub const TEST_ZONE: &str = "us-central1-a";

    pub fn plane() -> InMemoryControlPlane {
        InMemoryControlPlane::new(TEST_PROJECT)
    }
}
