//! Network security gateway bodies
//!
//! Server/client TLS policies and authorization policies.

use serde::{Deserialize, Serialize};

/// Reference to a certificate provider plugin instance
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateProvider {
    pub certificate_provider_instance: PluginInstance,
}

impl CertificateProvider {
    pub fn plugin(instance: impl Into<String>) -> Self {
        Self {
            certificate_provider_instance: PluginInstance {
                plugin_instance: instance.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginInstance {
    pub plugin_instance: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerTlsPolicyBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_certificate: Option<CertificateProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtls_policy: Option<MtlsPolicy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MtlsPolicy {
    pub client_validation_ca: Vec<CertificateProvider>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientTlsPolicyBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub server_validation_ca: Vec<CertificateProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<CertificateProvider>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthzAction {
    Allow,
    Deny,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPolicyBody {
    pub action: AuthzAction,
    pub rules: Vec<AuthzRule>,
}

/// Rule matching traffic by source identity and destination
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthzRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<AuthzSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<AuthzDestination>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthzSource {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub principals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_blocks: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthzDestination {
    pub hosts: Vec<String>,
    pub ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_policy_serializes_only_present_fields() {
        let body = ServerTlsPolicyBody {
            server_certificate: Some(CertificateProvider::plugin("spiffe")),
            mtls_policy: None,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json["serverCertificate"]["certificateProviderInstance"]["pluginInstance"],
            "spiffe"
        );
        assert!(json.get("mtlsPolicy").is_none());
    }

    #[test]
    fn test_authz_action_wire_format() {
        let body = AuthorizationPolicyBody {
            action: AuthzAction::Deny,
            rules: vec![AuthzRule::default()],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["action"], "DENY");
    }
}
