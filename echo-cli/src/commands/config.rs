use std::path::Path;

use anyhow::{Context, Result};
use echo_sync::EchoConfig;
use echo_sync::config::CONFIG_KEYS;

use crate::cli::ConfigCommands;

pub fn run_config(command: ConfigCommands, path: &Path) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = EchoConfig::load_from_path(path)?;
            for line in render_settings(&config) {
                println!("{line}");
            }
        }
        ConfigCommands::Set { key, value } => {
            set_value(path, &key, &value)?;
            println!("Updated {key}");
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

pub fn render_settings(config: &EchoConfig) -> Vec<String> {
    CONFIG_KEYS
        .iter()
        .filter_map(|key| {
            config
                .display_value(key)
                .map(|value| format!("{key} = {value}"))
        })
        .collect()
}

/// Loads the settings at `path`, applies one change and writes them back.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<EchoConfig> {
    let config = EchoConfig::load_from_path(path)?.with_value(key, value)?;
    config
        .save_to_path(path)
        .with_context(|| format!("failed to save settings to {}", path.display()))?;
    Ok(config)
}
