//! Shared types for note queue operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a note on the server.
///
/// Transitions are monotonic: `Pending` → `Claimed` → `Delivered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteState {
    Pending,
    Claimed,
    Delivered,
}

impl NoteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteState::Pending => "PENDING",
            NoteState::Claimed => "CLAIMED",
            NoteState::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for NoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note as returned by the Echo API.
///
/// `content` is only populated by the download endpoint; list, claim and
/// confirm responses may omit it or send an empty string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub vault_id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub state: NoteState,
    #[serde(default)]
    pub claim_owner: Option<String>,
    #[serde(default)]
    pub claim_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Returns the downloaded content, or an empty string if none was sent.
    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// What a pass does when one note fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the pass at the first failing note and return its error.
    #[default]
    Abort,
    /// Record the failure in the report and move on to the next note.
    Skip,
}

/// When the local file is written relative to the confirm call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOrder {
    /// Write the file, then confirm. A failed confirm leaves the file behind
    /// and the note is offered again on a later pass.
    #[default]
    BeforeConfirm,
    /// Confirm, then write the file. A failed write loses the content
    /// locally but the server never re-delivers a written note.
    AfterConfirm,
}

/// Per-note stage inside a sync pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteStage {
    Pending,
    Claiming,
    Downloading,
    Persisting,
    Confirming,
    Done,
    Failed,
}

impl NoteStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NoteStage::Done | NoteStage::Failed)
    }
}

impl fmt::Display for NoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteStage::Pending => "pending",
            NoteStage::Claiming => "claiming",
            NoteStage::Downloading => "downloading",
            NoteStage::Persisting => "persisting",
            NoteStage::Confirming => "confirming",
            NoteStage::Done => "done",
            NoteStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A note that failed during a pass run with [`FailurePolicy::Skip`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteFailure {
    pub note_id: String,
    /// Stage the note was in when it failed.
    pub stage: NoteStage,
    pub error: String,
}

/// Outcome of one completed sync pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub session_id: String,
    /// Notes returned by the pending listing.
    pub fetched: usize,
    /// Notes that reached [`NoteStage::Done`].
    pub synced: usize,
    pub failures: Vec<NoteFailure>,
    /// Files created, relative to the vault root.
    pub written: Vec<PathBuf>,
}
