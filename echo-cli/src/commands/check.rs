use anyhow::{Result, bail};
use echo_sync::EchoConfig;
use echo_sync::api_client::NoteQueueClient;

pub async fn run_check(config: &EchoConfig) -> Result<()> {
    let client = NoteQueueClient::new(config)?;
    if client.test_connection().await {
        println!("Echo: connected to {}", config.api_url);
        Ok(())
    } else {
        bail!("Echo: cannot reach {} with the configured token", config.api_url)
    }
}
