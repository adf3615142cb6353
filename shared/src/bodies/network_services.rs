//! Network services gateway bodies
//!
//! Meshes, gRPC/HTTP routes and endpoint policies.

use serde::{Deserialize, Serialize};

/// Mesh creation body; the mesh carries no settings of its own
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshBody {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcRouteBody {
    /// Mesh URLs the route attaches to
    pub meshes: Vec<String>,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteBody {
    pub meshes: Vec<String>,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<HttpRouteMatch>,
    pub action: RouteAction,
}

impl RouteRule {
    /// Rule without matchers forwarding everything to one service
    pub fn forward_to(service_name: impl Into<String>) -> Self {
        Self {
            matches: Vec::new(),
            action: RouteAction {
                destinations: vec![RouteDestination {
                    service_name: service_name.into(),
                    weight: None,
                }],
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_match: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path_match: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteAction {
    pub destinations: Vec<RouteDestination>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteDestination {
    /// Fully-qualified backend service resource name
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// Collects the destination services of a route rule list
pub fn route_destinations(rules: &[RouteRule]) -> Vec<String> {
    rules
        .iter()
        .flat_map(|rule| rule.action.destinations.iter())
        .map(|destination| destination.service_name.clone())
        .collect()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointPolicyType {
    GrpcServer,
    SidecarProxy,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPolicyBody {
    #[serde(rename = "type")]
    pub policy_type: EndpointPolicyType,
    pub traffic_port_selector: PortSelector,
    pub endpoint_matcher: EndpointMatcher,
    /// Name of the server TLS policy applied to matched endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_tls_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_policy: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PortSelector {
    pub ports: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMatcher {
    pub metadata_label_matcher: MetadataLabelMatcher,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataLabelMatcher {
    /// Either `MATCH_ALL` or `MATCH_ANY`
    pub metadata_label_match_criteria: String,
    pub metadata_labels: Vec<MetadataLabel>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataLabel {
    pub label_name: String,
    pub label_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_policy_wire_format() {
        let body = EndpointPolicyBody {
            policy_type: EndpointPolicyType::GrpcServer,
            traffic_port_selector: PortSelector {
                ports: vec!["8080".to_string()],
            },
            endpoint_matcher: EndpointMatcher {
                metadata_label_matcher: MetadataLabelMatcher {
                    metadata_label_match_criteria: "MATCH_ALL".to_string(),
                    metadata_labels: vec![MetadataLabel {
                        label_name: "app".to_string(),
                        label_value: "ns-server".to_string(),
                    }],
                },
            },
            server_tls_policy: None,
            authorization_policy: None,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["type"], "GRPC_SERVER");
        assert_eq!(json["trafficPortSelector"]["ports"][0], "8080");
        assert!(json.get("serverTlsPolicy").is_none());
    }

    #[test]
    fn test_forward_to_has_single_destination() {
        let rule = RouteRule::forward_to("projects/p/locations/global/backendServices/bs");
        assert_eq!(route_destinations(&[rule]).len(), 1);
    }

    #[test]
    fn test_route_destinations_reachable_from_bodies() {
        let rules = vec![
            RouteRule::forward_to("projects/p/locations/global/backendServices/a"),
            RouteRule::forward_to("projects/p/locations/global/backendServices/b"),
        ];

        assert_eq!(
            crate::bodies::route_destinations(&rules),
            vec![
                "projects/p/locations/global/backendServices/a".to_string(),
                "projects/p/locations/global/backendServices/b".to_string(),
            ]
        );
    }
}
