//! Bootstrap command - create the feature store schema and metadata tags.

use anyhow::{Context, Result};
use clap::Args;

use fview_catalog::{DryRunWarehouse, EntityTagStore, FeatureStore, Statement, Warehouse};

use crate::client::SqlApiClient;
use crate::commands::print_statements;
use crate::{Config, OutputFormat};

/// Arguments for the bootstrap command.
#[derive(Debug, Args)]
pub struct BootstrapArgs {
    /// Print the statements instead of executing them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Bootstraps the store and returns the SQL issued.
///
/// # Errors
///
/// Returns the first warehouse error.
pub async fn run<W>(store: &FeatureStore<W>) -> Result<Vec<String>>
where
    W: Warehouse + EntityTagStore,
{
    let statements = store.bootstrap().await?;
    Ok(statements.iter().map(Statement::to_sql).collect())
}

/// Execute the bootstrap command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a statement fails.
pub async fn execute(args: &BootstrapArgs, config: &Config) -> Result<()> {
    let client = SqlApiClient::new(config)?;
    let statements = if args.dry_run {
        run(&FeatureStore::new(DryRunWarehouse::new(client), config.store.clone())?).await?
    } else {
        run(&FeatureStore::new(client, config.store.clone())?).await?
    };

    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "database": config.store.database,
                    "schema": config.store.schema,
                    "dryRun": args.dry_run,
                    "statements": statements,
                }))
                .context("Failed to serialize response")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            if args.dry_run {
                println!("Bootstrap plan (not executed):");
            } else {
                println!(
                    "Feature store {}.{} is ready",
                    config.store.database, config.store.schema
                );
            }
            print_statements(&statements);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fview_catalog::MemoryWarehouse;
    use fview_core::Identifier;
    use fview_test_utils::{TEST_DATABASE, TEST_SCHEMA, test_config};

    fn ml() -> Identifier {
        Identifier::new(TEST_DATABASE).unwrap()
    }

    fn feature_store() -> Identifier {
        Identifier::new(TEST_SCHEMA).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let warehouse = MemoryWarehouse::new();
        let store = FeatureStore::new(warehouse.clone(), test_config()).unwrap();

        let first = run(&store).await.unwrap();
        let second = run(&store).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert!(first[0].starts_with("CREATE SCHEMA IF NOT EXISTS ML.FEATURE_STORE"));
        assert!(warehouse.has_schema(&ml(), &feature_store()).unwrap());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_warehouse_untouched() {
        let warehouse = MemoryWarehouse::new();
        let store =
            FeatureStore::new(DryRunWarehouse::new(warehouse.clone()), test_config()).unwrap();

        let statements = run(&store).await.unwrap();

        assert_eq!(statements.len(), 3);
        assert_eq!(store.warehouse().planned().unwrap().len(), 3);
        assert!(!warehouse.has_schema(&ml(), &feature_store()).unwrap());
    }

    #[test]
    fn test_bootstrap_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: BootstrapArgs,
        }

        let cli = TestCli::parse_from(["test", "--dry-run"]);
        assert!(cli.args.dry_run);
    }
}
