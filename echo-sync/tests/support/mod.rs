//! Shared test helpers: note fixtures, an in-memory note queue and an
//! in-memory local store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use echo_sync::api_client::NoteQueue;
use echo_sync::local_store::{LocalStore, LocalStoreResult};
use echo_sync::{EchoError, EchoResult, LocalStoreError, Note, NoteState};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
}

pub fn make_note(id: &str, title: &str) -> Note {
    Note {
        id: id.to_string(),
        vault_id: "vault-1".to_string(),
        external_id: None,
        title: title.to_string(),
        content: None,
        state: NoteState::Pending,
        claim_owner: None,
        claim_timestamp: None,
        created_at: created_at(),
        updated_at: created_at(),
    }
}

/// JSON body for a note as the API sends it.
pub fn note_json(id: &str, title: &str, state: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "vault_id": "vault-1",
        "external_id": null,
        "title": title,
        "content": "",
        "state": state,
        "claim_owner": null,
        "claim_timestamp": null,
        "created_at": "2024-03-05T10:00:00Z",
        "updated_at": "2024-03-05T10:00:00Z"
    })
}

pub fn downloaded_json(id: &str, title: &str, content: &str) -> serde_json::Value {
    let mut note = note_json(id, title, "CLAIMED");
    note["content"] = serde_json::json!(content);
    note["claim_owner"] = serde_json::json!("echo_client");
    note["claim_timestamp"] = serde_json::json!("2024-03-05T10:05:00Z");
    note
}

pub fn content_for(id: &str) -> String {
    format!("# {id}\n\nbody of {id}")
}

/// In-memory queue that enforces claim ownership the way the server does.
pub struct FakeQueue {
    notes: Mutex<Vec<Note>>,
    failures: Mutex<HashMap<(String, String), u16>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeQueue {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes: Mutex::new(notes),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Every operation sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes `operation` ("claim", "download", "confirm") on `note_id`
    /// answer with `status` until cleared.
    pub fn fail_on(&self, operation: &str, note_id: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert((operation.to_string(), note_id.to_string()), status);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn state_of(&self, note_id: &str) -> Option<NoteState> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == note_id)
            .map(|n| n.state)
    }

    async fn enter(&self, operation: &str, note_id: &str) -> EchoResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation} {note_id}"));
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get(&(operation.to_string(), note_id.to_string()))
            .copied();
        match failure {
            Some(status) => Err(EchoError::Api {
                operation: format!("{operation} note {note_id}"),
                status,
            }),
            None => Ok(()),
        }
    }

    fn update(&self, note_id: &str, f: impl FnOnce(&mut Note) -> EchoResult<()>) -> EchoResult<Note> {
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| EchoError::Api {
                operation: format!("note {note_id}"),
                status: 404,
            })?;
        f(note)?;
        Ok(note.clone())
    }
}

#[async_trait]
impl NoteQueue for FakeQueue {
    async fn list_pending(&self, limit: u32, offset: u32) -> EchoResult<Vec<Note>> {
        self.enter("list", "-").await?;
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.state == NoteState::Pending)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn claim(&self, note_id: &str, client_id: &str) -> EchoResult<Note> {
        self.enter("claim", note_id).await?;
        self.update(note_id, |note| {
            if note.state != NoteState::Pending {
                return Err(EchoError::Api {
                    operation: format!("claim note {}", note.id),
                    status: 409,
                });
            }
            note.state = NoteState::Claimed;
            note.claim_owner = Some(client_id.to_string());
            note.claim_timestamp = Some(Utc::now());
            Ok(())
        })
    }

    async fn download(&self, note_id: &str) -> EchoResult<Note> {
        self.enter("download", note_id).await?;
        let mut note = self.update(note_id, |note| {
            if note.state != NoteState::Claimed {
                return Err(EchoError::Api {
                    operation: format!("download note {}", note.id),
                    status: 403,
                });
            }
            Ok(())
        })?;
        note.content = Some(content_for(note_id));
        Ok(note)
    }

    async fn confirm(&self, note_id: &str) -> EchoResult<Note> {
        self.enter("confirm", note_id).await?;
        self.update(note_id, |note| {
            note.state = NoteState::Delivered;
            note.claim_owner = None;
            note.claim_timestamp = None;
            Ok(())
        })
    }
}

/// In-memory local store; never touches the filesystem.
#[derive(Default)]
pub struct MemoryStore {
    folders: Mutex<HashSet<PathBuf>>,
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryStore {
    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn ensure_folder(&self, folder: &Path) -> LocalStoreResult<()> {
        self.folders.lock().unwrap().insert(folder.to_path_buf());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> LocalStoreResult<bool> {
        Ok(self.folders.lock().unwrap().contains(path)
            || self.files.lock().unwrap().contains_key(path))
    }

    async fn create_file(&self, path: &Path, content: &str) -> LocalStoreResult<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(LocalStoreError::AlreadyExists(path.to_path_buf()));
        }
        files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
