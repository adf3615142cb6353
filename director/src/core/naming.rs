//! Deterministic resource naming
//!
//! Names are the only identity the orchestrator keeps for remote resources,
//! so the same (prefix, base, suffix) tuple must always produce the same
//! string. That is what lets a fresh process force-delete resources created
//! by an earlier one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPolicy {
    prefix: String,
    suffix: String,
}

impl NamingPolicy {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Dash-joined `{prefix}-{base}[-{suffix}]`
    pub fn name_for(&self, base: &str) -> String {
        let mut parts = vec![self.prefix.as_str(), base];
        // No trailing dash when the suffix is empty
        if !self.suffix.is_empty() {
            parts.push(self.suffix.as_str());
        }
        parts.join("-")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}
