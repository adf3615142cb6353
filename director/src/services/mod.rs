//! Gateway implementations
//!
//! The live control-plane clients sit outside this crate. What ships here is
//! the in-memory plane used by the CLI and the integration tests.

pub mod in_memory;

#[cfg(test)]
mod tests;

pub use in_memory::InMemoryControlPlane;
