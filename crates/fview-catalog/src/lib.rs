//! # fview-catalog
//!
//! Feature-view materialization engine for a warehouse feature store.
//!
//! This crate turns declared entities and feature views into tagged warehouse
//! objects, providing:
//!
//! - **Config Resolver**: Validates definitions and derives `name$version` object names
//! - **Entity Registry**: Registers entities as tags and validates references to them
//! - **Metadata Encoder**: Produces the tag payloads external clients parse
//! - **Object Reconciler**: Decides create / alter / skip / abort against observed state
//! - **Tag Applier**: Embeds metadata tags in the DDL that creates each object
//! - **Metadata Audit**: Finds (and optionally drops) objects with legacy metadata
//!
//! ## Persistence
//!
//! There is no internal catalog. Tags on warehouse objects are the only state:
//!
//! ```text
//! {database}.{schema}/
//! ├── SNOWML_FEATURE_STORE_ENTITY_<NAME>   # tag per entity, value = join keys
//! ├── SNOWML_FEATURE_STORE_OBJECT          # shared tag: object type + package version
//! ├── SNOWML_FEATURE_VIEW_METADATA         # shared tag: entities + timestamp column
//! └── <name>$<version>                     # VIEW or DYNAMIC TABLE carrying the tags above
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fview_catalog::prelude::*;
//!
//! let store = FeatureStore::new(warehouse, FeatureStoreConfig::new("ML"))?;
//! store.bootstrap().await?;
//! store
//!     .register_entity(&EntityDefinition::new("customer", &["customer_id"]))
//!     .await?;
//!
//! let def = FeatureViewDefinition::new(
//!     "customer_profile",
//!     "1.0",
//!     &["customer"],
//!     "SELECT customer_id, updated_at FROM customers",
//! );
//! let outcome = store.materialize(&def, MaterializeOptions::default()).await?;
//! assert_eq!(outcome.physical_name, "customer_profile$1_0");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod bootstrap;
pub mod ddl;
pub mod definition;
pub mod entity;
pub mod error;
pub mod materializer;
pub mod memory;
pub mod metadata;
pub mod reconciler;
pub mod resolver;
pub mod tags;
pub mod target_lag;
pub mod warehouse;

// Re-export main types at crate root
pub use audit::{AuditFinding, AuditReport, MetadataFormat, check_metadata_contract, classify_metadata};
pub use ddl::{ObjectDomain, Statement};
pub use definition::{
    ChangePolicy, EntityDefinition, FeatureViewDefinition, InitializeMode, RefreshMode, RefreshSpec,
};
pub use entity::{EntityRegistry, RegisteredEntity, RegistrationOutcome};
pub use error::{FeatureStoreError, Result};
pub use materializer::{
    EntityRegistration, FeatureStore, MaterializeAction, MaterializeOptions, MaterializeOutcome,
};
pub use memory::MemoryWarehouse;
pub use metadata::{EncodedMetadata, FeatureViewMetadata};
pub use reconciler::{Drift, ReconcilePlan};
pub use resolver::{ObjectKind, PhysicalObjectName, ResolvedFeatureView, resolve};
pub use target_lag::TargetLag;
pub use warehouse::{
    DryRunWarehouse, EntityTagStore, ObservedState, TagDefinition, TagReference, TagReferenceStore,
    Warehouse,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::definition::{ChangePolicy, EntityDefinition, FeatureViewDefinition, RefreshSpec};
    pub use crate::error::{FeatureStoreError, Result};
    pub use crate::materializer::{FeatureStore, MaterializeAction, MaterializeOptions};
    pub use crate::warehouse::{EntityTagStore, TagReferenceStore, Warehouse};
    pub use fview_core::FeatureStoreConfig;
}
