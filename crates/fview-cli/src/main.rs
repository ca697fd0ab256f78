//! fview CLI - feature-view materialization from the command line.
//!
//! The main entry point for the `fview` binary.

use anyhow::Result;
use clap::Parser;

use fview_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    fview_core::init_logging(cli.log_format);
    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Bootstrap(args) => {
                fview_cli::commands::bootstrap::execute(&args, &config).await
            }
            Commands::Entity(command) => {
                fview_cli::commands::entity::execute(command, &config).await
            }
            Commands::Materialize(args) => {
                fview_cli::commands::materialize::execute(args, &config).await
            }
            Commands::Apply(args) => fview_cli::commands::apply::execute(args, &config).await,
            Commands::Audit(args) => fview_cli::commands::audit::execute(&args, &config).await,
        }
    })
}
