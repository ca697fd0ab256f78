//! # fview-cli
//!
//! Command-line interface for feature-view materialization.
//!
//! ## Commands
//!
//! - `fview bootstrap` - Create the feature store schema and metadata tags
//! - `fview entity register|list|get` - Manage entity registrations
//! - `fview materialize` - Reconcile one feature view definition
//! - `fview apply` - Register entities and materialize every view of a project file
//! - `fview audit` - Find (and optionally drop) objects with legacy metadata
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `SNOWFLAKE_ACCOUNT` - Account identifier, used to derive the API URL
//! - `FVIEW_API_URL` - SQL API base URL (overrides the account-derived URL)
//! - `SNOWFLAKE_TOKEN` - Bearer token for the SQL API
//! - `SNOWFLAKE_TOKEN_TYPE` - Token type header (default: `KEYPAIR_JWT`)
//! - `SNOWFLAKE_DATABASE` / `SNOWFLAKE_SCHEMA` - Feature store location
//! - `SNOWFLAKE_WAREHOUSE` / `SNOWFLAKE_ROLE` - Session warehouse and role
//! - `FVIEW_PKG_VERSION` - Version advertised in object type tags

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod client;
pub mod commands;

use clap::{Parser, Subcommand};
use fview_core::{DEFAULT_PKG_VERSION, DEFAULT_SCHEMA, FeatureStoreConfig, LogFormat};

/// Default token type for the SQL API.
pub const DEFAULT_TOKEN_TYPE: &str = "KEYPAIR_JWT";

/// fview - versioned feature-view materialization.
#[derive(Debug, Parser)]
#[command(name = "fview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Account identifier (e.g. `myorg-myaccount`).
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub account: Option<String>,

    /// SQL API base URL. Defaults to `https://<account>.snowflakecomputing.com`.
    #[arg(long, env = "FVIEW_API_URL")]
    pub api_url: Option<String>,

    /// SQL API bearer token.
    #[arg(long, env = "SNOWFLAKE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// SQL API token type.
    #[arg(long, env = "SNOWFLAKE_TOKEN_TYPE", default_value = DEFAULT_TOKEN_TYPE)]
    pub token_type: String,

    /// Feature store database.
    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub database: Option<String>,

    /// Feature store schema.
    #[arg(long, env = "SNOWFLAKE_SCHEMA", default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Session warehouse.
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Option<String>,

    /// Session role.
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub role: Option<String>,

    /// Version advertised in object type tags.
    #[arg(long, env = "FVIEW_PKG_VERSION", default_value = DEFAULT_PKG_VERSION)]
    pub pkg_version: String,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Log format (`pretty` or `json`). Logs go to stderr.
    #[arg(long, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        let api_url = self
            .api_url
            .clone()
            .or_else(|| {
                self.account
                    .as_ref()
                    .map(|account| format!("https://{account}.snowflakecomputing.com"))
            })
            .map(|url| url.trim_end_matches('/').to_string());

        Config {
            api_url,
            token: self.token.clone(),
            token_type: self.token_type.clone(),
            store: FeatureStoreConfig {
                database: self.database.clone().unwrap_or_default(),
                schema: self.schema.clone(),
                default_warehouse: self.warehouse.clone(),
                role: self.role.clone(),
                pkg_version: self.pkg_version.clone(),
            },
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the feature store schema and metadata tags.
    Bootstrap(commands::bootstrap::BootstrapArgs),
    /// Register, list or inspect entities.
    #[command(subcommand)]
    Entity(commands::entity::EntityCommand),
    /// Materialize one feature view definition.
    Materialize(commands::materialize::MaterializeArgs),
    /// Register entities and materialize every feature view of a project.
    Apply(commands::apply::ApplyArgs),
    /// Audit feature view metadata tags.
    Audit(commands::audit::AuditArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQL API base URL.
    pub api_url: Option<String>,
    /// SQL API bearer token.
    pub token: Option<String>,
    /// SQL API token type.
    pub token_type: String,
    /// Feature store location and session settings.
    pub store: FeatureStoreConfig,
    /// Output format.
    pub format: OutputFormat,
}
