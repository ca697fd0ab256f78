//! CLI subcommands.
//!
//! Each command splits into a `run` function generic over the warehouse, so
//! it can be exercised against the in-memory warehouse, and an `execute`
//! entry point that wires up the SQL API client and prints the result.

pub mod apply;
pub mod audit;
pub mod bootstrap;
pub mod entity;
pub mod materialize;

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::de::DeserializeOwned;

use fview_catalog::{MaterializeAction, MaterializeOutcome};

use crate::OutputFormat;

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn format_action_colored(action: MaterializeAction) -> String {
    let label = action.as_str();
    match action {
        MaterializeAction::Created => label.green().to_string(),
        MaterializeAction::Replaced => label.yellow().to_string(),
        MaterializeAction::Altered => label.blue().to_string(),
        MaterializeAction::Unchanged => label.dimmed().to_string(),
        MaterializeAction::DriftIgnored => label.red().to_string(),
    }
}

/// Prints materialization outcomes in the configured format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_outcomes(
    outcomes: &[MaterializeOutcome],
    format: &OutputFormat,
    dry_run: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "dryRun": dry_run,
                    "featureViews": outcomes,
                }))
                .context("Failed to serialize outcomes")?
            );
        }
        OutputFormat::Text => {
            for outcome in outcomes {
                println!(
                    "{} {}",
                    outcome.object,
                    format_action_colored(outcome.action)
                );
                for warning in &outcome.warnings {
                    println!("  warning: {}", warning.yellow());
                }
                if dry_run {
                    for sql in &outcome.statements {
                        println!("  {sql};");
                    }
                }
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct OutcomeRow {
                #[tabled(rename = "Object")]
                object: String,
                #[tabled(rename = "Action")]
                action: String,
                #[tabled(rename = "Statements")]
                statements: usize,
                #[tabled(rename = "Warnings")]
                warnings: String,
            }

            let rows: Vec<_> = outcomes
                .iter()
                .map(|o| OutcomeRow {
                    object: o.object.clone(),
                    action: o.action.as_str().to_string(),
                    statements: o.statements.len(),
                    warnings: o.warnings.join("; "),
                })
                .collect();

            if rows.is_empty() {
                println!("No feature views");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

/// Prints SQL statements, one per line.
pub fn print_statements(statements: &[String]) {
    for sql in statements {
        println!("  {sql};");
    }
}
