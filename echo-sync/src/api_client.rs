//! Typed client for the Echo note queue API.
//!
//! Wraps [`HttpTransport`] with the four queue operations. Each call is
//! independent: nothing is retried, and any status other than 200 becomes
//! [`EchoError::Api`] for that operation.

use crate::config::EchoConfig;
use crate::error::{EchoError, EchoResult};
use crate::transport::{HttpTransport, TransportResponse};
use crate::types::{Note, NoteState};
use async_trait::async_trait;
use reqwest::{Method, Url};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// The server-side queue the sync engine drains.
#[async_trait]
pub trait NoteQueue: Send + Sync {
    /// Lists notes in `PENDING` state, one page at a time.
    async fn list_pending(&self, limit: u32, offset: u32) -> EchoResult<Vec<Note>>;

    /// Claims a pending note for `client_id`. The server arbitrates; a note
    /// that is already claimed (by anyone, including this client) fails.
    async fn claim(&self, note_id: &str, client_id: &str) -> EchoResult<Note>;

    /// Downloads a claimed note with its content.
    async fn download(&self, note_id: &str) -> EchoResult<Note>;

    /// Marks a note delivered.
    async fn confirm(&self, note_id: &str) -> EchoResult<Note>;
}

/// HTTP client for the Echo note queue.
#[derive(Clone)]
pub struct NoteQueueClient {
    transport: HttpTransport,
}

impl NoteQueueClient {
    pub fn new(config: &EchoConfig) -> EchoResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    /// Returns true if the API answers `GET /api/notes` with a success
    /// status. Network failures and error statuses both yield false.
    pub async fn test_connection(&self) -> bool {
        let result = match self.transport.endpoint(&["api", "notes"]) {
            Ok(url) => self.transport.request(Method::GET, url, None, &[]).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(resp) if resp.status.is_success() => true,
            Ok(resp) => {
                warn!("connection check got HTTP {}", resp.status);
                false
            }
            Err(e) => {
                warn!("connection check failed: {e}");
                false
            }
        }
    }

    /// `/api/notes/{note_id}/{action}` with the id as one encoded segment.
    fn note_endpoint(&self, note_id: &str, action: &str) -> EchoResult<Url> {
        self.transport.endpoint(&["api", "notes", note_id, action])
    }
}

/// Turns a raw response into `T`, or an `Api` error unless the status is 200.
fn decode<T: DeserializeOwned>(operation: &str, resp: TransportResponse) -> EchoResult<T> {
    if !resp.is_ok() {
        return Err(EchoError::api(operation, resp.status));
    }
    Ok(serde_json::from_value(resp.body)?)
}

#[async_trait]
impl NoteQueue for NoteQueueClient {
    async fn list_pending(&self, limit: u32, offset: u32) -> EchoResult<Vec<Note>> {
        let mut url = self.transport.endpoint(&["api", "notes"])?;
        url.query_pairs_mut()
            .append_pair("state", NoteState::Pending.as_str())
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        let resp = self.transport.request(Method::GET, url, None, &[]).await?;
        let notes: Vec<Note> = decode("list pending notes", resp)?;
        debug!("fetched {} pending notes (limit {limit}, offset {offset})", notes.len());
        Ok(notes)
    }

    async fn claim(&self, note_id: &str, client_id: &str) -> EchoResult<Note> {
        let body = serde_json::json!({ "client_id": client_id });
        let resp = self
            .transport
            .request(
                Method::POST,
                self.note_endpoint(note_id, "claim")?,
                Some(&body),
                &[(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            )
            .await?;
        decode(&format!("claim note {note_id}"), resp)
    }

    async fn download(&self, note_id: &str) -> EchoResult<Note> {
        let resp = self
            .transport
            .request(Method::GET, self.note_endpoint(note_id, "download")?, None, &[])
            .await?;
        decode(&format!("download note {note_id}"), resp)
    }

    async fn confirm(&self, note_id: &str) -> EchoResult<Note> {
        let resp = self
            .transport
            .request(Method::POST, self.note_endpoint(note_id, "confirm")?, None, &[])
            .await?;
        decode(&format!("confirm note {note_id}"), resp)
    }
}
