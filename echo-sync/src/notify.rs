//! User-facing messages for pass outcomes.
//!
//! Users see a short status line only. Error details belong in the log.

use crate::error::EchoResult;
use crate::types::SyncReport;
use tracing::error;

pub const SYNC_FAILED_MESSAGE: &str = "Echo: error syncing notes";

/// Message to show the user after a pass, if any.
///
/// A pass that synced nothing stays silent. Any error produces the same
/// generic message; the error itself is logged here.
pub fn user_message(outcome: &EchoResult<SyncReport>) -> Option<String> {
    match outcome {
        Ok(report) if report.synced == 0 => None,
        Ok(report) => {
            let noun = if report.synced == 1 { "note" } else { "notes" };
            Some(format!("Echo: synced {} {noun}", report.synced))
        }
        Err(e) => {
            error!("sync error: {e}");
            Some(SYNC_FAILED_MESSAGE.to_string())
        }
    }
}
