//! Backend service variants and their NEG membership

use serde::{Deserialize, Serialize};
use shared::{BackendProtocol, NegRef};
use std::collections::BTreeSet;
use std::fmt;

use super::ResourceKind;

/// The three independently tracked backend services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendVariant {
    Default,
    Alternative,
    Affinity,
}

impl BackendVariant {
    pub const ALL: [BackendVariant; 3] = [
        BackendVariant::Default,
        BackendVariant::Alternative,
        BackendVariant::Affinity,
    ];

    pub fn kind(&self) -> ResourceKind {
        match self {
            BackendVariant::Default => ResourceKind::BackendService,
            BackendVariant::Alternative => ResourceKind::AlternativeBackendService,
            BackendVariant::Affinity => ResourceKind::AffinityBackendService,
        }
    }

    fn index(&self) -> usize {
        match self {
            BackendVariant::Default => 0,
            BackendVariant::Alternative => 1,
            BackendVariant::Affinity => 2,
        }
    }
}

impl fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().label())
    }
}

/// Protocol and NEG membership recorded for one backend service variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendPool {
    pub protocol: BackendProtocol,
    members: BTreeSet<NegRef>,
}

impl BackendPool {
    /// Union `negs` into the membership set
    pub fn add(&mut self, negs: impl IntoIterator<Item = NegRef>) {
        self.members.extend(negs);
    }

    /// Remove every NEG in `negs` from the membership set
    pub fn remove(&mut self, negs: &BTreeSet<NegRef>) {
        self.members = self.members.difference(negs).cloned().collect();
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn members(&self) -> &BTreeSet<NegRef> {
        &self.members
    }

    /// Full membership in deterministic order, ready to push remotely
    pub fn to_vec(&self) -> Vec<NegRef> {
        self.members.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

/// Per-variant pools, all starting with an `Unset` protocol and no members
#[derive(Debug, Clone, Default)]
pub struct BackendPools {
    pools: [BackendPool; 3],
}

impl BackendPools {
    pub fn get(&self, variant: BackendVariant) -> &BackendPool {
        &self.pools[variant.index()]
    }

    pub fn get_mut(&mut self, variant: BackendVariant) -> &mut BackendPool {
        &mut self.pools[variant.index()]
    }

    pub fn protocol(&self, variant: BackendVariant) -> BackendProtocol {
        self.get(variant).protocol
    }
}
