//! Test infrastructure for the repository layer.
//!
//! Entity fixtures, seeding helpers and test doubles shared by the
//! integration tests.

#![allow(dead_code)]

pub mod doubles;
pub mod fixtures;

pub use doubles::*;
pub use fixtures::*;

/// Installs a test-writer tracing subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
