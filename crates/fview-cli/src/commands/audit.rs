//! Audit command - find objects whose metadata tag uses the legacy format.

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;

use fview_catalog::{AuditReport, FeatureStore, MetadataFormat};

use crate::client::SqlApiClient;
use crate::{Config, OutputFormat};

/// Arguments for the audit command.
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Drop objects with legacy metadata so they can be re-materialized.
    #[arg(long = "drop")]
    pub drop_legacy: bool,
}

/// Execute the audit command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the tag references
/// cannot be listed, or any drop failed.
pub async fn execute(args: &AuditArgs, config: &Config) -> Result<()> {
    let client = SqlApiClient::new(config)?;
    let store = FeatureStore::new(client, config.store.clone())?;
    let report = store.audit_metadata(args.drop_legacy).await?;

    print_report(&report, &config.format)?;

    let failed = report.dropped.iter().filter(|d| !d.succeeded()).count();
    if failed > 0 {
        anyhow::bail!("{failed} legacy object(s) could not be dropped");
    }
    Ok(())
}

fn format_colored(format: &MetadataFormat) -> String {
    match format {
        MetadataFormat::Current => "current".green().to_string(),
        MetadataFormat::Legacy => "legacy".yellow().to_string(),
        MetadataFormat::Invalid { reason } => format!("{} ({reason})", "invalid".red()),
    }
}

fn format_plain(format: &MetadataFormat) -> String {
    match format {
        MetadataFormat::Current => "current".to_string(),
        MetadataFormat::Legacy => "legacy".to_string(),
        MetadataFormat::Invalid { reason } => format!("invalid ({reason})"),
    }
}

fn print_report(report: &AuditReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).context("Failed to serialize report")?
            );
            return Ok(());
        }
        OutputFormat::Text => {
            if report.findings.is_empty() {
                println!("No feature view objects found");
                return Ok(());
            }
            for finding in &report.findings {
                println!(
                    "  {} ({}) {}",
                    finding.object,
                    finding.domain,
                    format_colored(&finding.format)
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct FindingRow {
                #[tabled(rename = "Object")]
                object: String,
                #[tabled(rename = "Domain")]
                domain: String,
                #[tabled(rename = "Metadata")]
                format: String,
            }

            let rows: Vec<_> = report
                .findings
                .iter()
                .map(|f| FindingRow {
                    object: f.object.clone(),
                    domain: f.domain.to_string(),
                    format: format_plain(&f.format),
                })
                .collect();

            if rows.is_empty() {
                println!("No feature view objects found");
                return Ok(());
            }
            println!("{}", Table::new(rows));
        }
    }

    println!();
    println!(
        "Checked {} object(s): {} legacy, {} invalid",
        report.findings.len(),
        report.legacy().len(),
        report.invalid().len()
    );
    for dropped in &report.dropped {
        match &dropped.error {
            None => println!("  Dropped {} {}", dropped.domain, dropped.object),
            Some(error) => println!(
                "  {} to drop {} {}: {error}",
                "Failed".red(),
                dropped.domain,
                dropped.object
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: AuditArgs,
        }

        assert!(TestCli::parse_from(["test", "--drop"]).args.drop_legacy);
        assert!(!TestCli::parse_from(["test"]).args.drop_legacy);
    }

    #[test]
    fn test_plain_format_includes_reason() {
        let format = MetadataFormat::Invalid {
            reason: "not valid JSON".into(),
        };
        assert_eq!(format_plain(&format), "invalid (not valid JSON)");
        assert_eq!(format_plain(&MetadataFormat::Legacy), "legacy");
    }
}
