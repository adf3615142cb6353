//! Compute gateway bodies
//!
//! Types describing health checks, backend services, routing maps,
//! forwarding rules and firewall rules.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::types::BackendProtocol;

/// Traffic-director backend service creation request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceSpec {
    pub name: String,
    /// URL of the health check the service probes its backends with
    pub health_check: Option<String>,
    pub protocol: BackendProtocol,
    #[serde(flatten)]
    pub options: BackendServiceOptions,
    pub enable_dualstack: bool,
}

/// Optional tuning knobs of a backend service
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset_size: Option<u32>,
    /// Header key used for consistent-hash session affinity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality_lb_policies: Option<Vec<LocalityLbPolicy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_detection: Option<OutlierDetection>,
}

impl BackendServiceOptions {
    pub fn with_subset_size(mut self, subset_size: u32) -> Self {
        self.subset_size = Some(subset_size);
        self
    }

    pub fn with_affinity_header(mut self, header: impl Into<String>) -> Self {
        self.affinity_header = Some(header.into());
        self
    }

    pub fn with_locality_lb_policies(mut self, policies: Vec<LocalityLbPolicy>) -> Self {
        self.locality_lb_policies = Some(policies);
        self
    }

    pub fn with_outlier_detection(mut self, outlier_detection: OutlierDetection) -> Self {
        self.outlier_detection = Some(outlier_detection);
        self
    }
}

/// One entry of a backend service's ordered locality LB policy list
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalityLbPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<NamedPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_policy: Option<CustomPolicy>,
}

impl LocalityLbPolicy {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            policy: Some(NamedPolicy { name: name.into() }),
            custom_policy: None,
        }
    }

    pub fn custom(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            policy: None,
            custom_policy: Some(CustomPolicy {
                name: name.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NamedPolicy {
    pub name: String,
}

/// Client-side LB policy identified by name with an opaque JSON config
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomPolicy {
    pub name: String,
    pub data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDetection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_ejection_time_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ejection_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consecutive_errors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcing_consecutive_errors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_minimum_hosts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_request_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_stdev_factor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcing_success_rate: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// Per-patch backend settings applied to every NEG in the membership set
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendPatchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate_per_endpoint: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breakers: Option<CircuitBreakers>,
}

/// In-place field patch of an existing backend service
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendServicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_settings: Option<SecuritySettings>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    /// URL of the client TLS policy
    pub client_tls_policy: String,
    pub subject_alt_names: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapBody {
    pub name: String,
    pub default_service: String,
    pub host_rules: Vec<HostRule>,
    pub path_matchers: Vec<PathMatcher>,
}

impl UrlMapBody {
    /// Routing map sending every listed host to a single backend service
    ///
    /// The host rule and the default path matcher share `matcher_name`.
    pub fn single_service(
        name: impl Into<String>,
        matcher_name: impl Into<String>,
        hosts: Vec<String>,
        service_url: impl Into<String>,
    ) -> Self {
        let matcher_name = matcher_name.into();
        let service_url = service_url.into();
        Self {
            name: name.into(),
            default_service: service_url.clone(),
            host_rules: vec![HostRule {
                hosts,
                path_matcher: matcher_name.clone(),
            }],
            path_matchers: vec![PathMatcher {
                name: matcher_name,
                default_service: service_url,
            }],
        }
    }

    /// Every backend service URL this map routes to, deduplicated
    pub fn referenced_services(&self) -> Vec<String> {
        let mut services = vec![self.default_service.clone()];
        for matcher in &self.path_matchers {
            if !services.contains(&matcher.default_service) {
                services.push(matcher.default_service.clone());
            }
        }
        services
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostRule {
    pub hosts: Vec<String>,
    pub path_matcher: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PathMatcher {
    pub name: String,
    pub default_service: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRuleSpec {
    pub name: String,
    pub port: u16,
    /// URL of the target proxy
    pub target: String,
    /// URL of the network, e.g. `global/networks/default`
    pub network: String,
    pub ip_address: IpAddr,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleSpec {
    pub name: String,
    pub network: String,
    pub source_range: String,
    pub allowed_ports: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_service_url_map_shares_matcher() {
        let body = UrlMapBody::single_service(
            "td-url-map",
            "td-path-matcher",
            vec!["svc.example:8080".to_string()],
            "global/backendServices/td-backend-service",
        );

        assert_eq!(body.host_rules[0].path_matcher, body.path_matchers[0].name);
        assert_eq!(body.default_service, body.path_matchers[0].default_service);
        assert_eq!(body.referenced_services().len(), 1);
    }

    #[test]
    fn test_url_map_serializes_camel_case() {
        let body = UrlMapBody::single_service("m", "pm", vec!["h:1".to_string()], "bs");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["defaultService"], "bs");
        assert_eq!(json["hostRules"][0]["pathMatcher"], "pm");
        assert_eq!(json["pathMatchers"][0]["defaultService"], "bs");
    }

    #[test]
    fn test_backend_options_skip_unset_fields() {
        let options = BackendServiceOptions::default().with_subset_size(4);
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["subsetSize"], 4);
        assert!(json.get("affinityHeader").is_none());
        assert!(json.get("outlierDetection").is_none());
    }
}
