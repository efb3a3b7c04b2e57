use std::path::Path;

use anyhow::{Result, bail};
use echo_sync::EchoConfig;
use echo_sync::notify::{SYNC_FAILED_MESSAGE, user_message};
use echo_sync::sync_engine::SyncEngine;

pub async fn run_sync(config: &EchoConfig, vault: &Path) -> Result<()> {
    for line in sync_once(config, vault).await? {
        println!("{line}");
    }
    Ok(())
}

/// Runs one pass and returns the lines to show the user. A pass that
/// synced nothing and skipped nothing shows nothing.
pub async fn sync_once(config: &EchoConfig, vault: &Path) -> Result<Vec<String>> {
    let engine = SyncEngine::from_config(config, vault)?;
    let outcome = engine.run_pass().await;
    let message = user_message(&outcome);

    match outcome {
        Ok(report) => {
            let mut lines: Vec<String> = message.into_iter().collect();
            if !report.failures.is_empty() {
                lines.push(format!("Echo: {} notes skipped, see log", report.failures.len()));
            }
            Ok(lines)
        }
        Err(_) => bail!(SYNC_FAILED_MESSAGE),
    }
}
