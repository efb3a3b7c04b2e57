//! Sync pass scheduler.
//!
//! Background loop that triggers passes:
//! - once, shortly after startup
//! - on a fixed interval
//! - on demand via [`SchedulerHandle::sync_now`]
//!
//! Passes run inline in the loop, so at most one is in flight. A config
//! update swaps in a freshly built engine between passes.

use crate::config::EchoConfig;
use crate::error::{EchoError, EchoResult};
use crate::sync_engine::SyncEngine;
use crate::types::SyncReport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Builds an engine for a given config.
pub type EngineFactory = Arc<dyn Fn(&EchoConfig) -> EchoResult<SyncEngine> + Send + Sync>;

/// Factory for engines that talk HTTP and write under `vault_root`.
pub fn http_engine_factory(vault_root: PathBuf) -> EngineFactory {
    Arc::new(move |config: &EchoConfig| SyncEngine::from_config(config, &vault_root))
}

/// What started a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Interval,
}

/// Result of a pass the scheduler started on its own.
#[derive(Debug)]
pub struct PassOutcome {
    pub trigger: Trigger,
    pub result: EchoResult<SyncReport>,
}

/// Commands accepted by the scheduler loop.
#[derive(Debug)]
pub enum SchedulerCommand {
    SyncNow {
        reply: oneshot::Sender<EchoResult<SyncReport>>,
    },
    UpdateConfig {
        config: EchoConfig,
        reply: oneshot::Sender<EchoResult<()>>,
    },
    Stop,
}

/// Handle for sending commands to the scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Runs a pass now and waits for its result. Queued behind a pass that
    /// is already running.
    pub async fn sync_now(&self) -> EchoResult<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::SyncNow { reply })
            .await
            .map_err(|_| EchoError::SchedulerStopped)?;
        rx.await.map_err(|_| EchoError::SchedulerStopped)?
    }

    /// Replaces the configuration. Later requests use the new values.
    pub async fn update_config(&self, config: EchoConfig) -> EchoResult<()> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::UpdateConfig { config, reply })
            .await
            .map_err(|_| EchoError::SchedulerStopped)?;
        rx.await.map_err(|_| EchoError::SchedulerStopped)?
    }

    pub async fn stop(&self) -> EchoResult<()> {
        self.command_tx
            .send(SchedulerCommand::Stop)
            .await
            .map_err(|_| EchoError::SchedulerStopped)
    }
}

/// Scheduler loop state. Consumed by [`SyncScheduler::run`].
pub struct SyncScheduler {
    config: EchoConfig,
    engine: SyncEngine,
    factory: EngineFactory,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    outcome_tx: mpsc::Sender<PassOutcome>,
}

/// Creates a scheduler, its command handle, and the receiver for outcomes
/// of startup and interval passes.
pub fn create_scheduler(
    config: EchoConfig,
    factory: EngineFactory,
) -> EchoResult<(SchedulerHandle, mpsc::Receiver<PassOutcome>, SyncScheduler)> {
    config.validate()?;
    let engine = factory(&config)?;

    let (command_tx, command_rx) = mpsc::channel(16);
    let (outcome_tx, outcome_rx) = mpsc::channel(16);

    let scheduler = SyncScheduler {
        config,
        engine,
        factory,
        command_rx,
        outcome_tx,
    };

    Ok((SchedulerHandle { command_tx }, outcome_rx, scheduler))
}

fn pass_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl SyncScheduler {
    /// Runs the scheduler loop until stopped or every handle is dropped.
    pub async fn run(mut self) {
        info!(
            "sync scheduler started (first pass in {:?}, then every {:?})",
            self.config.startup_delay(),
            self.config.sync_interval()
        );

        let startup = tokio::time::sleep(self.config.startup_delay());
        tokio::pin!(startup);
        let mut startup_pending = true;
        let mut interval = pass_interval(self.config.sync_interval());

        loop {
            tokio::select! {
                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    self.scheduled_pass(Trigger::Startup).await;
                }
                _ = interval.tick() => {
                    self.scheduled_pass(Trigger::Interval).await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::SyncNow { reply }) => {
                            debug!("manual sync requested");
                            let result = self.engine.run_pass().await;
                            if reply.send(result).is_err() {
                                debug!("manual sync caller went away before the result");
                            }
                        }
                        Some(SchedulerCommand::UpdateConfig { config, reply }) => {
                            let interval_changed = config.sync_interval_secs != self.config.sync_interval_secs;
                            let result = self.apply_config(config);
                            if result.is_ok() && interval_changed {
                                interval = pass_interval(self.config.sync_interval());
                            }
                            let _ = reply.send(result);
                        }
                        Some(SchedulerCommand::Stop) => {
                            info!("sync scheduler stopping");
                            break;
                        }
                        None => {
                            info!("command channel closed, stopping sync scheduler");
                            break;
                        }
                    }
                }
            }
        }

        info!("sync scheduler stopped");
    }

    fn apply_config(&mut self, config: EchoConfig) -> EchoResult<()> {
        config.validate()?;
        let engine = (self.factory)(&config).inspect_err(|e| {
            warn!("rejected config update: {e}");
        })?;
        self.engine = engine;
        self.config = config;
        info!("sync configuration updated");
        Ok(())
    }

    async fn scheduled_pass(&mut self, trigger: Trigger) {
        debug!("{trigger:?} sync pass triggered");
        let result = self.engine.run_pass().await;
        if let Err(e) = &result {
            warn!("{trigger:?} sync pass failed: {e}");
        }
        if self
            .outcome_tx
            .send(PassOutcome { trigger, result })
            .await
            .is_err()
        {
            debug!("no listener for pass outcomes");
        }
    }
}
