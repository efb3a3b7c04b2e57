//! Note sync orchestrator.
//!
//! One pass drains a single page of pending notes. Each note is driven
//! through its own state machine by the controller loop in
//! [`SyncEngine::run_pass`]:
//!
//! ```text
//! Pending -> Claiming -> Downloading -> Persisting -> Confirming -> Done
//!                                  \-> Confirming -> Persisting -/   (after_confirm)
//! any stage -> Failed
//! ```
//!
//! Notes are processed strictly one after another. Side effects of earlier
//! steps (server-side claims, written files) are never rolled back.

use crate::api_client::{NoteQueue, NoteQueueClient};
use crate::config::EchoConfig;
use crate::error::{EchoError, EchoResult};
use crate::filename::note_path;
use crate::local_store::{FsLocalStore, LocalStore};
use crate::types::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-pass settings taken from [`EchoConfig`] when the engine is built.
#[derive(Clone, Debug)]
struct PassSettings {
    save_folder: String,
    client_id: String,
    page_size: u32,
    failure_policy: FailurePolicy,
    write_order: WriteOrder,
}

impl From<&EchoConfig> for PassSettings {
    fn from(config: &EchoConfig) -> Self {
        Self {
            save_folder: config.save_folder.clone(),
            client_id: config.client_id.clone(),
            page_size: config.page_size,
            failure_policy: config.failure_policy,
            write_order: config.write_order,
        }
    }
}

/// State for one sync pass. Never persisted.
#[derive(Debug)]
pub struct SyncSession {
    pub session_id: String,
    pub client_id: String,
    /// Pending notes in the order the server listed them.
    pub batch: Vec<Note>,
}

/// Returns the stage that follows `stage` on success.
pub fn next_stage(order: WriteOrder, stage: NoteStage) -> NoteStage {
    use NoteStage::*;
    match (order, stage) {
        (_, Pending) => Claiming,
        (_, Claiming) => Downloading,
        (WriteOrder::BeforeConfirm, Downloading) => Persisting,
        (WriteOrder::BeforeConfirm, Persisting) => Confirming,
        (WriteOrder::BeforeConfirm, Confirming) => Done,
        (WriteOrder::AfterConfirm, Downloading) => Confirming,
        (WriteOrder::AfterConfirm, Confirming) => Persisting,
        (WriteOrder::AfterConfirm, Persisting) => Done,
        (_, Done) => Done,
        (_, Failed) => Failed,
    }
}

/// Applies the result of the work done in `stage`. A failed step moves a
/// live note to `Failed`; terminal stages never change.
pub fn transition(order: WriteOrder, stage: NoteStage, succeeded: bool) -> NoteStage {
    if succeeded || stage.is_terminal() {
        next_stage(order, stage)
    } else {
        NoteStage::Failed
    }
}

/// Error raised while a note was in `stage`.
struct StageError {
    stage: NoteStage,
    error: EchoError,
}

/// Clears the busy flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives sync passes against a note queue and a local store.
///
/// Clones share the busy flag, so at most one pass runs across all clones.
#[derive(Clone)]
pub struct SyncEngine {
    queue: Arc<dyn NoteQueue>,
    store: Arc<dyn LocalStore>,
    settings: PassSettings,
    busy: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(queue: Arc<dyn NoteQueue>, store: Arc<dyn LocalStore>, config: &EchoConfig) -> Self {
        Self {
            queue,
            store,
            settings: PassSettings::from(config),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Builds an engine talking HTTP to `config.api_url` and writing under
    /// `vault_root`.
    pub fn from_config(config: &EchoConfig, vault_root: &Path) -> EchoResult<Self> {
        config.validate()?;
        let queue = NoteQueueClient::new(config)?;
        let store = FsLocalStore::new(vault_root);
        Ok(Self::new(Arc::new(queue), Arc::new(store), config))
    }

    /// Returns true while a pass is in flight.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one sync pass.
    ///
    /// Fails with [`EchoError::SyncInProgress`] if another pass is running.
    /// Under [`FailurePolicy::Abort`] the first failing note ends the pass
    /// with its error; notes before it stay synced.
    pub async fn run_pass(&self) -> EchoResult<SyncReport> {
        let _guard = PassGuard::try_acquire(&self.busy).ok_or(EchoError::SyncInProgress)?;

        self.store
            .ensure_folder(Path::new(&self.settings.save_folder))
            .await?;

        let session = self.start_session().await?;
        info!(
            "sync pass {} started with {} pending notes",
            session.session_id,
            session.batch.len()
        );

        let mut report = SyncReport {
            session_id: session.session_id.clone(),
            fetched: session.batch.len(),
            ..Default::default()
        };

        for note in &session.batch {
            match self.sync_note(&session, note).await {
                Ok(path) => {
                    report.synced += 1;
                    report.written.push(path);
                }
                Err(StageError { stage, error: e }) => match self.settings.failure_policy {
                    FailurePolicy::Abort => {
                        error!(
                            "sync pass {} aborted at note {} while {stage}: {e}",
                            session.session_id, note.id
                        );
                        return Err(e);
                    }
                    FailurePolicy::Skip => {
                        warn!(
                            "sync pass {} skipping note {} (failed while {stage}): {e}",
                            session.session_id, note.id
                        );
                        report.failures.push(NoteFailure {
                            note_id: note.id.clone(),
                            stage,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        info!(
            "sync pass {} finished: {} of {} notes synced",
            report.session_id, report.synced, report.fetched
        );
        Ok(report)
    }

    async fn start_session(&self) -> EchoResult<SyncSession> {
        let batch = self.queue.list_pending(self.settings.page_size, 0).await?;
        if batch.len() as u64 >= u64::from(self.settings.page_size) {
            warn!(
                "pending listing filled the page ({}); remaining notes wait for a later pass",
                self.settings.page_size
            );
        }
        Ok(SyncSession {
            session_id: Uuid::now_v7().to_string(),
            client_id: self.settings.client_id.clone(),
            batch,
        })
    }

    /// Drives one note to `Done` or `Failed`, returning the path written.
    async fn sync_note(&self, session: &SyncSession, note: &Note) -> Result<PathBuf, StageError> {
        let order = self.settings.write_order;
        let path = note_path(&self.settings.save_folder, note);
        let mut downloaded: Option<Note> = None;
        let mut stage = NoteStage::Pending;
        let mut failure = None;

        while !stage.is_terminal() {
            let step = match stage {
                NoteStage::Pending => Ok(()),
                NoteStage::Claiming => self
                    .queue
                    .claim(&note.id, &session.client_id)
                    .await
                    .map(|claimed| {
                        debug!("claimed note {} as {:?}", claimed.id, claimed.claim_owner);
                    }),
                NoteStage::Downloading => self.queue.download(&note.id).await.map(|full| {
                    downloaded = Some(full);
                }),
                NoteStage::Persisting => {
                    let content = downloaded.as_ref().map(Note::content_or_empty).unwrap_or_default();
                    self.store
                        .create_file(&path, content)
                        .await
                        .map_err(EchoError::from)
                }
                NoteStage::Confirming => self.queue.confirm(&note.id).await.map(|confirmed| {
                    debug!("confirmed note {} ({})", confirmed.id, confirmed.state);
                }),
                NoteStage::Done | NoteStage::Failed => break,
            };

            let next = transition(order, stage, step.is_ok());
            if let Err(error) = step {
                debug!("note {} failed while {stage}", note.id);
                failure = Some(StageError { stage, error });
            }
            stage = next;
        }

        match failure {
            Some(failure) => Err(failure),
            None => {
                debug!("note {} synced to {}", note.id, path.display());
                Ok(path)
            }
        }
    }
}
