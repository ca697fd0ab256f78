//! Feature store bootstrap: the schema and the shared metadata tags.
//!
//! Every statement is `IF NOT EXISTS`, so bootstrapping an existing store is
//! a no-op on the warehouse side.

use fview_core::{FeatureStoreConfig, Identifier};

use crate::ddl::Statement;
use crate::error::Result;
use crate::metadata::{FEATURE_STORE_OBJECT_TAG, FEATURE_VIEW_METADATA_TAG};
use crate::warehouse::Warehouse;

/// Returns the statements that prepare the feature store schema.
///
/// # Errors
///
/// Returns an error if the configured database or schema is not a valid
/// identifier.
pub fn bootstrap_statements(config: &FeatureStoreConfig) -> Result<Vec<Statement>> {
    let database = Identifier::new(config.database.as_str())?;
    let schema = Identifier::new(config.schema.as_str())?;

    let mut statements = vec![Statement::CreateSchema { database, schema }];
    for (tag, comment) in [
        (FEATURE_STORE_OBJECT_TAG, "feature store object type"),
        (FEATURE_VIEW_METADATA_TAG, "feature view metadata"),
    ] {
        statements.push(Statement::CreateTag {
            name: config.qualify(&Identifier::new(tag)?)?,
            allowed_value: None,
            comment: Some(comment.to_string()),
        });
    }
    Ok(statements)
}

/// Creates the schema and shared tags, returning what was executed.
///
/// # Errors
///
/// Returns the first warehouse error; later statements are not attempted.
pub async fn bootstrap<W: Warehouse + ?Sized>(
    warehouse: &W,
    config: &FeatureStoreConfig,
) -> Result<Vec<Statement>> {
    let statements = bootstrap_statements(config)?;
    for statement in &statements {
        tracing::debug!(sql = %statement, "bootstrap");
        warehouse.execute(statement).await?;
    }
    tracing::info!(
        database = %config.database,
        schema = %config.schema,
        "feature store bootstrapped"
    );
    Ok(statements)
}
