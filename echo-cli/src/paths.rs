//! Settings file location.

use std::path::PathBuf;

use anyhow::{Context, Result};

const CONFIG_DIR_NAME: &str = "echo-sync";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("could not resolve the user config directory")?;
    Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Explicit `--config` path, else the platform default.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}
