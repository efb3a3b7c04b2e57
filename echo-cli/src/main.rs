//! Echo sync CLI
//!
//! Pulls pending notes from the Echo API into a local vault folder.

mod cli;
mod commands;
mod paths;


use anyhow::Result;
use clap::Parser;
use echo_sync::EchoConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{check, config, run, sync};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(error) = run(Cli::parse()).await {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = paths::resolve_config_path(cli.config)?;

    match cli.command {
        Commands::Config { command } => config::run_config(command, &config_path),
        Commands::Sync => {
            let settings = EchoConfig::load_from_path(&config_path)?;
            sync::run_sync(&settings, &cli.vault).await
        }
        Commands::Run => run::run_daemon(config_path, cli.vault).await,
        Commands::Check => {
            let settings = EchoConfig::load_from_path(&config_path)?;
            check::run_check(&settings).await
        }
    }
}
