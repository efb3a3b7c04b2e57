//! Note queue sync engine for Echo.
//!
//! Pulls pending notes from the Echo API and delivers them into a local
//! folder as Markdown files:
//! - Authenticated HTTP transport with bearer tokens
//! - Typed note queue client (list, claim, download, confirm)
//! - Per-note sync state machine with single-flight passes
//! - Scheduler for startup, interval and manual triggers
//! - Filesystem-backed local store

pub mod api_client;
pub mod config;
pub mod error;
pub mod filename;
pub mod local_store;
pub mod notify;
pub mod scheduler;
pub mod sync_engine;
pub mod transport;
pub mod types;

pub use config::EchoConfig;
pub use error::{EchoError, EchoResult, LocalStoreError};
pub use types::*;
