//! Orchestrator configuration
//!
//! Settings shared by the base orchestrator and its extensions. The binary
//! fills this from command-line flags and `TD_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::error::{DirectorError, DirectorResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorConfig {
    pub project: String,
    pub network: String,
    pub resource_prefix: String,
    /// Empty suffix means names carry no trailing segment
    pub resource_suffix: String,
    pub compute_api_version: String,
    pub enable_dualstack: bool,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            network: "default".to_string(),
            resource_prefix: String::new(),
            resource_suffix: String::new(),
            compute_api_version: "v1".to_string(),
            enable_dualstack: false,
        }
    }
}

impl DirectorConfig {
    pub fn new(project: impl Into<String>, resource_prefix: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            resource_prefix: resource_prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.resource_suffix = suffix.into();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_compute_api_version(mut self, version: impl Into<String>) -> Self {
        self.compute_api_version = version.into();
        self
    }

    pub fn with_dualstack(mut self, enabled: bool) -> Self {
        self.enable_dualstack = enabled;
        self
    }

    /// Network reference used by forwarding and firewall rules
    pub fn network_url(&self) -> String {
        format!("global/networks/{}", self.network)
    }

    pub fn validate(&self) -> DirectorResult<()> {
        if self.project.trim().is_empty() {
            return Err(DirectorError::config("project must not be empty"));
        }
        if self.resource_prefix.trim().is_empty() {
            return Err(DirectorError::config("resource prefix must not be empty"));
        }
        if self.network.trim().is_empty() {
            return Err(DirectorError::config("network must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DirectorConfig::new("my-project", "td");
        assert_eq!(config.network, "default");
        assert_eq!(config.compute_api_version, "v1");
        assert_eq!(config.network_url(), "global/networks/default");
        assert!(!config.enable_dualstack);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_prefix() {
        let config = DirectorConfig::new("my-project", " ");
        assert!(matches!(config.validate(), Err(DirectorError::Configuration { .. })));
    }

    #[test]
    fn test_validation_rejects_missing_project() {
        let config = DirectorConfig::new("", "td");
        assert!(config.validate().is_err());
    }
}
