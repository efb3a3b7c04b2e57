use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use echo_sync::notify::user_message;
use echo_sync::scheduler::{SchedulerHandle, create_scheduler, http_engine_factory};
use echo_sync::{EchoConfig, EchoError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// How often the daemon re-reads the settings file.
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the scheduler until interrupted, printing a line per pass that did
/// something. Edits to the settings file are applied while running.
pub async fn run_daemon(config_path: PathBuf, vault: PathBuf) -> Result<()> {
    let config = EchoConfig::load_from_path(&config_path)?;
    let (handle, mut outcomes, scheduler) =
        create_scheduler(config.clone(), http_engine_factory(vault))?;
    let task = tokio::spawn(scheduler.run());

    let mut settings = SettingsReloader::new(config_path, config);
    let mut settings_poll =
        tokio::time::interval_at(Instant::now() + SETTINGS_POLL_INTERVAL, SETTINGS_POLL_INTERVAL);
    settings_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            outcome = outcomes.recv() => match outcome {
                Some(outcome) => {
                    if let Some(message) = user_message(&outcome.result) {
                        println!("{message}");
                    }
                }
                None => break,
            },
            _ = settings_poll.tick() => {
                settings.reload(&handle).await?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupt received");
                handle.stop().await?;
                break;
            }
        }
    }

    task.await?;
    Ok(())
}

/// Watches the settings file and hands changes to a running scheduler.
pub struct SettingsReloader {
    path: PathBuf,
    current: EchoConfig,
    last_warning: Option<String>,
}

impl SettingsReloader {
    pub fn new(path: PathBuf, current: EchoConfig) -> Self {
        Self {
            path,
            current,
            last_warning: None,
        }
    }

    pub fn current(&self) -> &EchoConfig {
        &self.current
    }

    /// Re-reads the file and applies it if it changed. Returns true when a
    /// new config was applied.
    ///
    /// An unreadable or invalid file is logged once and the running config
    /// is kept. Only a stopped scheduler is an error.
    pub async fn reload(&mut self, handle: &SchedulerHandle) -> Result<bool> {
        let next = match EchoConfig::load_from_path(&self.path) {
            Ok(next) => next,
            Err(e) => {
                self.warn_once(format!("ignoring settings file {}: {e}", self.path.display()));
                return Ok(false);
            }
        };
        if next == self.current {
            self.last_warning = None;
            return Ok(false);
        }

        match handle.update_config(next.clone()).await {
            Ok(()) => {
                info!("settings reloaded from {}", self.path.display());
                self.current = next;
                self.last_warning = None;
                Ok(true)
            }
            Err(EchoError::SchedulerStopped) => Err(EchoError::SchedulerStopped.into()),
            Err(e) => {
                self.warn_once(format!("rejected settings from {}: {e}", self.path.display()));
                Ok(false)
            }
        }
    }

    fn warn_once(&mut self, message: String) {
        if self.last_warning.as_deref() != Some(message.as_str()) {
            warn!("{message}");
            self.last_warning = Some(message);
        }
    }
}
