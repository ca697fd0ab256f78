//! Shared test utilities for fview integration tests.
//!
//! This crate provides:
//! - [`RecordingWarehouse`]: In-memory warehouse with operation recording and failure injection
//! - [`TestContext`]: A feature store over a recording warehouse
//! - Fixture functions for entities and feature views
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use fview_test_utils::{TestContext, customer_entity, customer_profile};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::bootstrapped().await;
//!     ctx.store.register_entity(&customer_entity()).await.unwrap();
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod warehouse;

pub use assertions::*;
pub use fixtures::*;
pub use warehouse::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fview=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
