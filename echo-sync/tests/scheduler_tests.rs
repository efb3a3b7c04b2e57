mod support;

use echo_sync::scheduler::{
    EngineFactory, PassOutcome, SchedulerHandle, Trigger, create_scheduler, http_engine_factory,
};
use echo_sync::sync_engine::SyncEngine;
use echo_sync::{EchoConfig, EchoError};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::{FakeQueue, MemoryStore, make_note};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Factory that hands out engines over shared fakes and records every
/// config it was asked to build from.
fn fake_factory(
    queue: Arc<FakeQueue>,
    store: Arc<MemoryStore>,
    built: Arc<Mutex<Vec<EchoConfig>>>,
) -> EngineFactory {
    Arc::new(move |config: &EchoConfig| {
        built.lock().unwrap().push(config.clone());
        Ok(SyncEngine::new(queue.clone(), store.clone(), config))
    })
}

fn quiet_config() -> EchoConfig {
    EchoConfig {
        startup_delay_secs: 3600,
        sync_interval_secs: 7200,
        ..EchoConfig::default()
    }
}

fn start(
    config: EchoConfig,
    factory: EngineFactory,
) -> (SchedulerHandle, mpsc::Receiver<PassOutcome>, JoinHandle<()>) {
    let (handle, outcomes, scheduler) = create_scheduler(config, factory).unwrap();
    let task = tokio::spawn(scheduler.run());
    (handle, outcomes, task)
}

// --- Timed triggers ---

#[tokio::test(start_paused = true)]
async fn first_pass_runs_after_startup_delay() {
    let queue = Arc::new(FakeQueue::new(vec![make_note("n-1", "One")]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));
    let started = Instant::now();

    let (handle, mut outcomes, task) = start(
        EchoConfig::default(),
        fake_factory(queue.clone(), store.clone(), built),
    );

    let outcome = outcomes.recv().await.unwrap();
    assert_eq!(outcome.trigger, Trigger::Startup);
    assert_eq!(outcome.result.unwrap().synced, 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(600));
    assert_eq!(store.file("Echo/2024-03-05 One.md").unwrap(), support::content_for("n-1"));

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_passes_follow_the_startup_pass() {
    let queue = Arc::new(FakeQueue::new(vec![]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));
    let started = Instant::now();

    let (handle, mut outcomes, task) =
        start(EchoConfig::default(), fake_factory(queue.clone(), store, built));

    assert_eq!(outcomes.recv().await.unwrap().trigger, Trigger::Startup);

    let second = outcomes.recv().await.unwrap();
    assert_eq!(second.trigger, Trigger::Interval);
    assert!(started.elapsed() >= Duration::from_secs(600));

    let third = outcomes.recv().await.unwrap();
    assert_eq!(third.trigger, Trigger::Interval);
    assert!(started.elapsed() >= Duration::from_secs(1200));

    // Each pass only lists; nothing was pending.
    assert_eq!(queue.calls(), vec!["list -", "list -", "list -"]);

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_scheduled_pass_reports_error_and_keeps_running() {
    let queue = Arc::new(FakeQueue::new(vec![make_note("n-1", "One")]));
    queue.fail_on("claim", "n-1", 409);
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, mut outcomes, task) =
        start(EchoConfig::default(), fake_factory(queue.clone(), store.clone(), built));

    let first = outcomes.recv().await.unwrap();
    assert!(first.result.unwrap_err().is_conflict());

    queue.clear_failures();
    let second = outcomes.recv().await.unwrap();
    // The note stayed pending in the fake, so the next pass delivers it.
    assert_eq!(second.result.unwrap().synced, 1);
    assert_eq!(store.file_count(), 1);

    handle.stop().await.unwrap();
    task.await.unwrap();
}

// --- Manual trigger ---

#[tokio::test]
async fn sync_now_returns_the_report() {
    let queue = Arc::new(FakeQueue::new(vec![make_note("n-1", "One"), make_note("n-2", "Two")]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) =
        start(quiet_config(), fake_factory(queue, store.clone(), built));

    let report = handle.sync_now().await.unwrap();
    assert_eq!(report.synced, 2);
    assert_eq!(store.file_count(), 2);

    let report = handle.sync_now().await.unwrap();
    assert_eq!(report.synced, 0);

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn concurrent_manual_triggers_run_one_after_another() {
    let queue = Arc::new(
        FakeQueue::new(vec![make_note("n-1", "One")]).with_delay(Duration::from_millis(20)),
    );
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) =
        start(quiet_config(), fake_factory(queue.clone(), store, built));
    let other = handle.clone();

    let (a, b) = tokio::join!(handle.sync_now(), other.sync_now());
    let (a, b) = (a.unwrap(), b.unwrap());

    // Neither pass saw the other in flight; one delivered, one found nothing.
    assert_eq!(a.synced + b.synced, 1);
    assert_eq!(
        queue.calls(),
        vec!["list -", "claim n-1", "download n-1", "confirm n-1", "list -"]
    );

    handle.stop().await.unwrap();
    task.await.unwrap();
}

// --- Config updates ---

#[tokio::test]
async fn update_config_rebuilds_engine() {
    let queue = Arc::new(FakeQueue::new(vec![make_note("n-1", "One")]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) =
        start(quiet_config(), fake_factory(queue, store.clone(), built.clone()));

    let next = quiet_config().with_value("save_folder", "Inbox").unwrap();
    handle.update_config(next.clone()).await.unwrap();
    handle.sync_now().await.unwrap();

    assert_eq!(built.lock().unwrap().len(), 2);
    assert_eq!(built.lock().unwrap()[1], next);
    assert!(store.file("Inbox/2024-03-05 One.md").is_some());

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn invalid_config_update_is_rejected() {
    let queue = Arc::new(FakeQueue::new(vec![make_note("n-1", "One")]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) =
        start(quiet_config(), fake_factory(queue, store.clone(), built.clone()));

    let bad = EchoConfig {
        page_size: 0,
        ..quiet_config()
    };
    let err = handle.update_config(bad).await.unwrap_err();
    assert!(matches!(err, EchoError::Config(_)));
    assert_eq!(built.lock().unwrap().len(), 1);

    // The previous configuration is still in effect.
    handle.sync_now().await.unwrap();
    assert!(store.file("Echo/2024-03-05 One.md").is_some());

    handle.stop().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn token_update_applies_to_later_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/notes"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notes"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let config = EchoConfig {
        api_url: server.uri(),
        vault_token: "old-token".into(),
        ..quiet_config()
    };
    let (handle, _outcomes, task) =
        start(config.clone(), http_engine_factory(dir.path().to_path_buf()));

    handle.sync_now().await.unwrap();
    handle
        .update_config(config.with_value("vault_token", "new-token").unwrap())
        .await
        .unwrap();
    handle.sync_now().await.unwrap();
    handle.sync_now().await.unwrap();

    handle.stop().await.unwrap();
    task.await.unwrap();
}

// --- Lifecycle ---

#[tokio::test]
async fn stopped_scheduler_rejects_commands() {
    let queue = Arc::new(FakeQueue::new(vec![]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) = start(quiet_config(), fake_factory(queue, store, built));
    handle.stop().await.unwrap();
    task.await.unwrap();

    assert!(matches!(
        handle.sync_now().await.unwrap_err(),
        EchoError::SchedulerStopped
    ));
}

#[tokio::test]
async fn dropping_every_handle_stops_the_loop() {
    let queue = Arc::new(FakeQueue::new(vec![]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let (handle, _outcomes, task) = start(quiet_config(), fake_factory(queue, store, built));
    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("scheduler should stop")
        .unwrap();
}

#[test]
fn invalid_initial_config_is_rejected() {
    let queue = Arc::new(FakeQueue::new(vec![]));
    let store = Arc::new(MemoryStore::default());
    let built = Arc::new(Mutex::new(Vec::new()));

    let config = EchoConfig {
        api_url: "not a url".into(),
        ..EchoConfig::default()
    };
    assert!(create_scheduler(config, fake_factory(queue, store, built.clone())).is_err());
    assert!(built.lock().unwrap().is_empty());
}
