//! # fview-core
//!
//! Shared primitives for the fview feature-store materializer.
//!
//! This crate provides the foundational types used across all fview components:
//!
//! - **Identifiers**: Warehouse identifiers with explicit quoting rules
//! - **Literals**: Escaping for SQL string literals (tag values, comments, lags)
//! - **Error Types**: Shared error definitions and result types
//! - **Configuration**: Feature store location and package version settings
//! - **Observability**: Logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `fview-core` knows nothing about feature views or reconciliation. It only
//! defines the vocabulary every other crate uses to talk to a warehouse.
//!
//! ## Example
//!
//! ```rust
//! use fview_core::prelude::*;
//!
//! let name = Identifier::new("customer_profile$1_0").unwrap();
//! assert_eq!(name.to_sql(), "customer_profile$1_0");
//! assert_eq!(name.resolved(), "CUSTOMER_PROFILE$1_0");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod ident;
pub mod observability;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::FeatureStoreConfig;
    pub use crate::error::{Error, Result};
    pub use crate::ident::{Identifier, QualifiedName, quote_literal};
}

pub use config::{DEFAULT_PKG_VERSION, DEFAULT_SCHEMA, FeatureStoreConfig};
pub use error::{Error, Result};
pub use ident::{Identifier, QualifiedName, quote_literal};
pub use observability::{LogFormat, init_logging, materialize_span};
