//! Apply command - register entities and materialize a whole project.
//!
//! A project file lists entities and feature views:
//!
//! ```json
//! {
//!   "entities": [{"name": "customer", "join_keys": ["customer_id"]}],
//!   "feature_views": [{"name": "customer_profile", "version": "1.0", ...}]
//! }
//! ```
//!
//! Entities are registered first so that every view can reference them.
//! Processing stops at the first failure; work already done is reported.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

use fview_catalog::{
    DryRunWarehouse, EntityDefinition, EntityRegistration, EntityTagStore, FeatureStore,
    FeatureViewDefinition, MaterializeOptions, MaterializeOutcome, RegistrationOutcome, Warehouse,
};

use crate::client::SqlApiClient;
use crate::commands::{print_outcomes, read_json};
use crate::{Config, OutputFormat};

/// Arguments for the apply command.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Path to the project file (JSON).
    #[arg(long = "file", short = 'f')]
    pub project_file: PathBuf,

    /// Recreate every feature view, ignoring change policies.
    #[arg(long)]
    pub full_refresh: bool,

    /// Print the statements instead of executing them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Entities and feature views applied together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Entities to register.
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    /// Feature views to materialize, in order.
    #[serde(default)]
    pub feature_views: Vec<FeatureViewDefinition>,
}

/// The step that stopped an apply.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyFailure {
    /// Entity or feature view name.
    pub object: String,
    /// Error message, including its causes.
    pub error: String,
}

/// Everything an apply did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Entity registrations, in project order.
    pub entities: Vec<EntityRegistration>,
    /// Materialized feature views, in project order.
    pub feature_views: Vec<MaterializeOutcome>,
    /// The failure that stopped the apply, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ApplyFailure>,
}

/// Registers the project's entities, then materializes its feature views.
///
/// Stops at the first failure and records it in the report.
pub async fn run<W>(
    store: &FeatureStore<W>,
    project: &Project,
    options: MaterializeOptions,
) -> ApplyReport
where
    W: Warehouse + EntityTagStore,
{
    let mut report = ApplyReport::default();

    for entity in &project.entities {
        match store.register_entity(entity).await {
            Ok(registration) => report.entities.push(registration),
            Err(err) => {
                report.failure = Some(ApplyFailure {
                    object: entity.name.clone(),
                    error: format!("{:#}", anyhow::Error::from(err)),
                });
                return report;
            }
        }
    }

    for view in &project.feature_views {
        match store.materialize(view, options).await {
            Ok(outcome) => report.feature_views.push(outcome),
            Err(err) => {
                report.failure = Some(ApplyFailure {
                    object: view.name.clone(),
                    error: format!("{:#}", anyhow::Error::from(err)),
                });
                return report;
            }
        }
    }

    report
}

/// Execute the apply command.
///
/// # Errors
///
/// Returns an error if the project file or configuration is invalid, or if
/// any step of the apply fails.
pub async fn execute(args: ApplyArgs, config: &Config) -> Result<()> {
    let project: Project = read_json(&args.project_file)?;
    let options = MaterializeOptions {
        full_refresh: args.full_refresh,
    };
    let client = SqlApiClient::new(config)?;

    let report = if args.dry_run {
        let store = FeatureStore::new(DryRunWarehouse::new(client), config.store.clone())?;
        run(&store, &project, options).await
    } else {
        let store = FeatureStore::new(client, config.store.clone())?;
        run(&store, &project, options).await
    };

    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            for registration in &report.entities {
                let outcome = match registration.outcome {
                    RegistrationOutcome::Registered => "registered".green().to_string(),
                    RegistrationOutcome::AlreadyRegistered => {
                        "already registered".dimmed().to_string()
                    }
                };
                println!("entity {} {outcome}", registration.entity.name);
            }
            print_outcomes(&report.feature_views, &config.format, args.dry_run)?;
            if let Some(failure) = &report.failure {
                eprintln!("{} {}: {}", "Failed".red(), failure.object, failure.error);
            }
        }
    }

    if let Some(failure) = report.failure {
        anyhow::bail!("apply stopped at '{}'", failure.object);
    }
    Ok(())
}
