//! Core bookkeeping modules
//!
//! Pure state with no I/O dependencies: naming, the slot registry and the
//! backend membership sets.

pub mod membership;
pub mod naming;
pub mod registry;

pub use membership::{BackendPool, BackendPools, BackendVariant};
pub use naming::NamingPolicy;
pub use registry::{Deletion, ResourceKind, ResourceRegistry, Slot};
