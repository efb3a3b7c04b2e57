//! Echo sync configuration.
//!
//! A config is an immutable value. Editing a setting produces a new
//! `EchoConfig`, and callers rebuild their client from it instead of
//! mutating shared state.

use crate::error::{EchoError, EchoResult};
use crate::types::{FailurePolicy, WriteOrder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use std::time::Duration;

/// Keys accepted by [`EchoConfig::with_value`].
pub const CONFIG_KEYS: &[&str] = &[
    "api_url",
    "vault_token",
    "save_folder",
    "client_id",
    "page_size",
    "request_timeout_secs",
    "sync_interval_secs",
    "startup_delay_secs",
    "failure_policy",
    "write_order",
];

/// Configuration for the note sync client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Base URL for the Echo API (e.g., "https://echo.yourhost.com").
    pub api_url: String,

    /// Vault token sent as the bearer credential. May be empty.
    pub vault_token: String,

    /// Folder, relative to the vault root, that receives delivered notes.
    pub save_folder: String,

    /// Identifier this client claims notes under.
    pub client_id: String,

    /// Notes fetched per pass. Only the first page is processed.
    pub page_size: u32,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Interval between scheduled passes (seconds).
    pub sync_interval_secs: u64,

    /// Delay before the first pass after startup (seconds).
    pub startup_delay_secs: u64,

    pub failure_policy: FailurePolicy,

    pub write_order: WriteOrder,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            api_url: "https://echo.yourhost.com".to_string(),
            vault_token: String::new(),
            save_folder: "Echo".to_string(),
            client_id: "echo_client".to_string(),
            page_size: 1000,
            request_timeout_secs: 30,
            sync_interval_secs: 10 * 60,
            startup_delay_secs: 1,
            failure_policy: FailurePolicy::Abort,
            write_order: WriteOrder::BeforeConfirm,
        }
    }
}

impl EchoConfig {
    /// Loads a config file, falling back to defaults for missing keys.
    /// A missing file yields the default config.
    pub fn load_from_path(path: &Path) -> EchoResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            EchoError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            EchoError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> EchoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EchoError::Config(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)
            .map_err(|e| EchoError::Config(format!("failed to write {}: {e}", path.display())))
    }

    /// Returns a copy of this config with one setting replaced.
    pub fn with_value(&self, key: &str, value: &str) -> EchoResult<Self> {
        let mut next = self.clone();
        match key {
            "api_url" => next.api_url = value.trim().trim_end_matches('/').to_string(),
            "vault_token" => next.vault_token = value.trim().to_string(),
            "save_folder" => next.save_folder = value.trim().to_string(),
            "client_id" => next.client_id = value.trim().to_string(),
            "page_size" => next.page_size = parse_number(key, value)?,
            "request_timeout_secs" => next.request_timeout_secs = parse_number(key, value)?,
            "sync_interval_secs" => next.sync_interval_secs = parse_number(key, value)?,
            "startup_delay_secs" => next.startup_delay_secs = parse_number(key, value)?,
            "failure_policy" => {
                next.failure_policy = match value.trim() {
                    "abort" => FailurePolicy::Abort,
                    "skip" => FailurePolicy::Skip,
                    other => {
                        return Err(EchoError::Config(format!(
                            "failure_policy must be abort or skip, got {other:?}"
                        )));
                    }
                }
            }
            "write_order" => {
                next.write_order = match value.trim() {
                    "before_confirm" => WriteOrder::BeforeConfirm,
                    "after_confirm" => WriteOrder::AfterConfirm,
                    other => {
                        return Err(EchoError::Config(format!(
                            "write_order must be before_confirm or after_confirm, got {other:?}"
                        )));
                    }
                }
            }
            other => return Err(EchoError::Config(format!("unknown setting: {other}"))),
        }
        next.validate()?;
        Ok(next)
    }

    /// Checks invariants that serde defaults cannot express.
    pub fn validate(&self) -> EchoResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(EchoError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.save_folder.is_empty() {
            return Err(EchoError::Config("save_folder cannot be empty".to_string()));
        }
        let folder = Path::new(&self.save_folder);
        if folder.is_absolute() || folder.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(EchoError::Config(format!(
                "save_folder must be a relative path inside the vault, got {:?}",
                self.save_folder
            )));
        }
        if self.client_id.is_empty() {
            return Err(EchoError::Config("client_id cannot be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(EchoError::Config("page_size must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(EchoError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(EchoError::Config(
                "sync_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Renders the value of a setting for display. The token is masked.
    pub fn display_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "api_url" => self.api_url.clone(),
            "vault_token" if self.vault_token.is_empty() => "(empty)".to_string(),
            "vault_token" => "********".to_string(),
            "save_folder" => self.save_folder.clone(),
            "client_id" => self.client_id.clone(),
            "page_size" => self.page_size.to_string(),
            "request_timeout_secs" => self.request_timeout_secs.to_string(),
            "sync_interval_secs" => self.sync_interval_secs.to_string(),
            "startup_delay_secs" => self.startup_delay_secs.to_string(),
            "failure_policy" => match self.failure_policy {
                FailurePolicy::Abort => "abort".to_string(),
                FailurePolicy::Skip => "skip".to_string(),
            },
            "write_order" => match self.write_order {
                WriteOrder::BeforeConfirm => "before_confirm".to_string(),
                WriteOrder::AfterConfirm => "after_confirm".to_string(),
            },
            _ => return None,
        };
        Some(value)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> EchoResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EchoError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}
