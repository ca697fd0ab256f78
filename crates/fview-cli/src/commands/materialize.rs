//! Materialize command - reconcile one feature view definition.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fview_catalog::{
    DryRunWarehouse, EntityTagStore, FeatureStore, FeatureViewDefinition, MaterializeOptions,
    MaterializeOutcome, Warehouse,
};

use crate::client::SqlApiClient;
use crate::commands::{print_outcomes, read_json};
use crate::Config;

/// Arguments for the materialize command.
#[derive(Debug, Args)]
pub struct MaterializeArgs {
    /// Path to the feature view definition (JSON).
    #[arg(long = "file", short = 'f')]
    pub definition_file: PathBuf,

    /// Recreate the object even if it exists, ignoring the change policy.
    #[arg(long)]
    pub full_refresh: bool,

    /// Print the statements instead of executing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl MaterializeArgs {
    /// Returns the materialization options selected by the flags.
    #[must_use]
    pub fn options(&self) -> MaterializeOptions {
        MaterializeOptions {
            full_refresh: self.full_refresh,
        }
    }
}

/// Materializes `def`.
///
/// # Errors
///
/// Returns the materialization error, with the feature view name as context.
pub async fn run<W>(
    store: &FeatureStore<W>,
    def: &FeatureViewDefinition,
    options: MaterializeOptions,
) -> Result<MaterializeOutcome>
where
    W: Warehouse + EntityTagStore,
{
    store
        .materialize(def, options)
        .await
        .with_context(|| format!("Failed to materialize feature view '{}'", def.name))
}

/// Execute the materialize command.
///
/// # Errors
///
/// Returns an error if the definition file is invalid, the configuration is
/// invalid, or materialization fails.
pub async fn execute(args: MaterializeArgs, config: &Config) -> Result<()> {
    let def: FeatureViewDefinition = read_json(&args.definition_file)?;
    let client = SqlApiClient::new(config)?;

    let outcome = if args.dry_run {
        let store = FeatureStore::new(DryRunWarehouse::new(client), config.store.clone())?;
        run(&store, &def, args.options()).await?
    } else {
        let store = FeatureStore::new(client, config.store.clone())?;
        run(&store, &def, args.options()).await?
    };

    print_outcomes(std::slice::from_ref(&outcome), &config.format, args.dry_run)
}
