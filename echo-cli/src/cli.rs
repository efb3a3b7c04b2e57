use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "echo-sync")]
#[command(about = "Sync pending Echo notes into a local folder as Markdown")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Vault root that the save folder lives under
    #[arg(long, global = true, value_name = "PATH", default_value = ".")]
    pub vault: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync pass now
    Sync,
    /// Keep running: sync shortly after start, then on every interval
    Run,
    /// Check that the API is reachable with the configured token
    Check,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print every setting (the token is masked)
    Show,
    /// Change one setting
    Set {
        /// Setting name, e.g. api_url or vault_token
        key: String,
        /// New value
        value: String,
    },
    /// Print the settings file location
    Path,
}
