//! Common test utilities and infrastructure
//!
//! Shared fixtures and builders used by the unit and integration suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{DirectorBuilder, TestHelpers};
