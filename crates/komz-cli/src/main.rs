//! Komz CLI
//!
//! Command-line entry point for the Komz demo gateway.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use komz_cli::cli::{Cli, Command};
use komz_cli::{commands, config_handlers};
use komz_core::GatewayConfig;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info,komz=info",
        1 => "info,komz=debug",
        _ => "debug,komz=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Config { action } => {
            let mut stdout = std::io::stdout().lock();
            config_handlers::handle_config_command(config_path, action, &mut stdout)?;
        }
        Command::Serve { host, port } => {
            let config = GatewayConfig::load(config_path)?;
            commands::serve(config, host, port).await?;
        }
        Command::Chat => {
            let config = GatewayConfig::load(config_path)?;
            commands::chat(&config).await?;
        }
        Command::Call { agent_id } => {
            let config = GatewayConfig::load(config_path)?;
            commands::call(&config, agent_id).await?;
        }
    }

    Ok(())
}
