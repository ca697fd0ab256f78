//! Pre-built test fixtures for common test scenarios.
//!
//! Provides factory functions to create definitions with sensible defaults.

use fview_catalog::definition::{
    ChangePolicy, EntityDefinition, FeatureViewDefinition, RefreshSpec,
};
use fview_catalog::materializer::FeatureStore;
use fview_core::{FeatureStoreConfig, Identifier, QualifiedName};

use crate::warehouse::RecordingWarehouse;

/// Database used by fixtures.
pub const TEST_DATABASE: &str = "ML";

/// Schema used by fixtures.
pub const TEST_SCHEMA: &str = "FEATURE_STORE";

/// Test context: a feature store over a recording warehouse.
pub struct TestContext {
    /// Feature store under test.
    pub store: FeatureStore<RecordingWarehouse>,
    /// Handle sharing state with the store's warehouse.
    pub warehouse: RecordingWarehouse,
}

impl TestContext {
    /// Creates a context over an empty warehouse (no schema, no tags).
    #[must_use]
    pub fn new() -> Self {
        let warehouse = RecordingWarehouse::new();
        let store = FeatureStore::new(warehouse.clone(), test_config()).expect("valid config");
        Self { store, warehouse }
    }

    /// Creates a context with the schema and shared tags in place and the
    /// bootstrap operations cleared.
    pub async fn bootstrapped() -> Self {
        let ctx = Self::new();
        ctx.store.bootstrap().await.expect("bootstrap");
        ctx.warehouse.clear_operations();
        ctx
    }

    /// Creates a bootstrapped context with the `customer` entity registered.
    pub async fn with_customer() -> Self {
        let ctx = Self::bootstrapped().await;
        ctx.store
            .register_entity(&customer_entity())
            .await
            .expect("register customer");
        ctx.warehouse.clear_operations();
        ctx
    }

    /// Qualifies `name` with the test database and schema.
    #[must_use]
    pub fn qualified(&self, name: &str) -> QualifiedName {
        qualified(name)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the fixture configuration.
#[must_use]
pub fn test_config() -> FeatureStoreConfig {
    FeatureStoreConfig::new(TEST_DATABASE).with_schema(TEST_SCHEMA)
}

/// Qualifies `name` with the test database and schema.
#[must_use]
pub fn qualified(name: &str) -> QualifiedName {
    QualifiedName::new(
        Identifier::new(TEST_DATABASE).expect("valid"),
        Identifier::new(TEST_SCHEMA).expect("valid"),
        Identifier::new(name).expect("valid"),
    )
}

/// `customer` entity keyed by `customer_id`.
#[must_use]
pub fn customer_entity() -> EntityDefinition {
    EntityDefinition::new("customer", &["customer_id"]).with_description("retail customers")
}

/// `store` entity keyed by `store_id, region`.
#[must_use]
pub fn store_entity() -> EntityDefinition {
    EntityDefinition::new("store", &["store_id", "region"])
}

/// Static `customer_profile` v1.0 with timestamp column `updated_at`.
#[must_use]
pub fn customer_profile() -> FeatureViewDefinition {
    FeatureViewDefinition::new(
        "customer_profile",
        "1.0",
        &["customer"],
        "SELECT customer_id, lifetime_value, updated_at FROM customers",
    )
    .with_timestamp_col("updated_at")
}

/// Managed `customer_activity` v1.0 refreshing every `frequency` on `ADMIN_WH`.
#[must_use]
pub fn customer_activity(frequency: &str, policy: ChangePolicy) -> FeatureViewDefinition {
    FeatureViewDefinition::new(
        "customer_activity",
        "1.0",
        &["customer"],
        "SELECT customer_id, count(*) AS orders_30d, max(ordered_at) AS ts FROM orders GROUP BY 1",
    )
    .with_timestamp_col("ts")
    .with_refresh(RefreshSpec::new(frequency, "ADMIN_WH"))
    .with_change_policy(policy)
}
