//! Driver tests against a real notify watcher
//!
//! Platform watchers deliver events with some latency, so every wait here
//! polls the target with a generous deadline instead of sleeping a fixed time.

use mirror_watcher::{SessionConfig, SessionReport, Strategy, SyncSession};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEADLINE: Duration = Duration::from_secs(10);

fn config(strategy: Strategy) -> SessionConfig {
    SessionConfig {
        window: Duration::from_millis(50),
        idle_poll: Duration::from_millis(20),
        strategy,
        ..SessionConfig::default()
    }
}

fn spawn_session(
    config: SessionConfig,
    source: &Path,
    target: &Path,
) -> (watch::Sender<bool>, JoinHandle<anyhow::Result<SessionReport>>) {
    let session = SyncSession::new(config, source, target).unwrap();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { session.run(rx).await });
    (tx, handle)
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_replicates_creates_and_deletes() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    fs::write(source.path().join("existing.txt"), b"seeded").unwrap();

    let (shutdown, handle) = spawn_session(config(Strategy::Diff), source.path(), target.path());

    let seeded = target.path().join("existing.txt");
    assert!(wait_for(|| seeded.exists()).await, "seed did not reach target");

    // Give the watcher time to register before mutating the source
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::create_dir_all(source.path().join("nested")).unwrap();
    fs::write(source.path().join("nested/new.txt"), b"fresh").unwrap();

    let replicated = target.path().join("nested/new.txt");
    assert!(
        wait_for(|| fs::read(&replicated).map(|c| c == b"fresh").unwrap_or(false)).await,
        "new file was not replicated"
    );

    fs::remove_file(source.path().join("existing.txt")).unwrap();
    assert!(
        wait_for(|| !seeded.exists()).await,
        "delete was not replicated"
    );

    shutdown.send(true).unwrap();
    let report = handle.await.unwrap().unwrap();
    assert!(report.batches >= 1);
    assert!(report.changes_applied >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_during_seed_is_replicated() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    fs::create_dir_all(source.path().join("bulk")).unwrap();
    for i in 0..500 {
        fs::write(source.path().join(format!("bulk/{:04}.bin", i)), vec![i as u8; 4096]).unwrap();
    }

    let (shutdown, handle) = spawn_session(config(Strategy::Diff), source.path(), target.path());

    // Once the first seeded file lands the source listing is already taken,
    // so this write can only reach the target through the watcher
    let bulk = target.path().join("bulk");
    assert!(
        wait_for(|| fs::read_dir(&bulk).map(|mut d| d.next().is_some()).unwrap_or(false)).await,
        "seed never started"
    );
    fs::write(source.path().join("late.txt"), b"written mid-seed").unwrap();

    let late = target.path().join("late.txt");
    assert!(
        wait_for(|| fs::read(&late).map(|c| c == b"written mid-seed").unwrap_or(false)).await,
        "write during seed was lost"
    );
    assert!(bulk.join("0499.bin").exists());

    shutdown.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_ignores_builtin_paths() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();

    let (shutdown, handle) = spawn_session(config(Strategy::Diff), source.path(), target.path());
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::create_dir_all(source.path().join(".git")).unwrap();
    fs::write(source.path().join(".git/HEAD"), b"ref: refs/heads/main").unwrap();
    fs::write(source.path().join("tracked.txt"), b"yes").unwrap();

    let tracked = target.path().join("tracked.txt");
    assert!(wait_for(|| tracked.exists()).await);
    assert!(!target.path().join(".git").exists());

    shutdown.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_session_replaces_target() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("stale.txt"), b"stale").unwrap();

    let (shutdown, handle) = spawn_session(config(Strategy::Archive), source.path(), target.path());

    let stale = target.path().join("stale.txt");
    assert!(wait_for(|| !stale.exists()).await, "seed did not replace target");

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(source.path().join("packed.txt"), b"packed").unwrap();

    let packed = target.path().join("packed.txt");
    assert!(wait_for(|| packed.exists()).await);

    shutdown.send(true).unwrap();
    let report = handle.await.unwrap().unwrap();
    assert!(report.batches >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_fails_when_source_disappears() {
    let parent = TempDir::new().unwrap();
    let source = parent.path().join("source");
    fs::create_dir_all(&source).unwrap();
    let target = TempDir::new().unwrap();

    let (_shutdown, handle) = spawn_session(config(Strategy::Diff), &source, target.path());
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::remove_dir_all(&source).unwrap();

    let result = tokio::time::timeout(DEADLINE, handle)
        .await
        .expect("session kept running without its source")
        .unwrap();
    assert!(result.is_err());
}
