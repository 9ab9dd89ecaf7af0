// tests/backup_rotation.rs

mod common;
use crate::common::{
    datetime, eventually, init_tracing, FakeServer, RecordingListener, ServerConfigBuilder,
    TestResult, FAKE_SERVER_SCRIPT,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use obsidia::backup::{is_valid_id, select_evictions, BackupManager, BackupRecord};
use obsidia::clock::{Clock, ManualClock};
use obsidia::config::BackupPolicy;
use obsidia::errors::ObsidiaError;
use obsidia::fs::mock::MockFileSystem;
use obsidia::fs::FileSystem;
use obsidia::logs::LogMultiplexer;
use obsidia::supervisor::SupervisorState;

fn policy(max_backups: usize) -> BackupPolicy {
    BackupPolicy {
        schedule: None,
        max_backups,
        root: PathBuf::from("backups"),
        exclude: vec!["session.lock".to_string()],
    }
}

fn mock_world() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("srv/world/level.dat", "level-v1");
    fs.add_file("srv/world/region/r.0.0.mca", "chunks-v1");
    fs.add_file("srv/world/session.lock", "lock");
    fs
}

fn manager(fs: &MockFileSystem, clock: Arc<ManualClock>, max: usize) -> BackupManager {
    BackupManager::new(
        Path::new("srv"),
        "world",
        &policy(max),
        Arc::new(fs.clone()),
        clock,
        Arc::new(LogMultiplexer::new("srv")),
    )
}

fn ids(records: &[BackupRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn three_backups_with_max_two_keep_the_newest_two() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock.clone(), 2);

    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(backups.backup(None).await?.id);
        clock.advance(ChronoDuration::seconds(60));
    }

    let remaining = ids(&backups.list()?);
    assert_eq!(remaining, vec![created[1].clone(), created[2].clone()]);
    assert!(!fs.exists(&Path::new("srv/backups").join(&created[0])));
    Ok(())
}

#[tokio::test]
async fn backup_mirrors_the_world_without_lock_files() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock.clone(), 5);

    let record = backups.backup(None).await?;
    assert_eq!(record.timestamp, Some(clock.unix_timestamp()));

    let root = Path::new("srv/backups").join(&record.id);
    assert_eq!(fs.contents(root.join("level.dat")), Some(b"level-v1".to_vec()));
    assert_eq!(
        fs.contents(root.join("region/r.0.0.mca")),
        Some(b"chunks-v1".to_vec())
    );
    assert!(!fs.exists(&root.join("session.lock")));
    Ok(())
}

#[tokio::test]
async fn missing_backup_root_lists_empty() -> TestResult {
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    assert!(manager(&fs, clock, 5).list()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn same_second_backup_is_rejected() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock, 5);

    backups.backup(None).await?;
    assert!(backups.backup(None).await.is_err());
    assert_eq!(backups.list()?.len(), 1);
    assert!(!backups.is_in_progress());
    Ok(())
}

#[tokio::test]
async fn backup_without_world_fails_and_reports() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("srv");
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let logs = Arc::new(LogMultiplexer::new("srv"));
    let listener = RecordingListener::new();
    logs.subscribe(Arc::new(listener.clone()));
    let backups = BackupManager::new(
        Path::new("srv"),
        "world",
        &policy(5),
        Arc::new(fs.clone()),
        clock,
        logs,
    );

    assert!(backups.backup(None).await.is_err());
    eventually("failure notice", || listener.contains("[Backup] Backup failed")).await;
    assert!(listener.contains("[Backup] Starting backup..."));
    Ok(())
}

#[tokio::test]
async fn restore_of_missing_id_leaves_world_untouched() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock, 5);
    backups.backup(None).await?;

    for id in ["missing-id", "../world", "", "a/b"] {
        let result = backups.restore(id, SupervisorState::Stopped).await;
        assert!(
            matches!(result, Err(ObsidiaError::BackupNotFound(_))),
            "{id:?}: {result:?}"
        );
    }
    assert_eq!(fs.contents("srv/world/level.dat"), Some(b"level-v1".to_vec()));
    assert_eq!(fs.contents("srv/world/session.lock"), Some(b"lock".to_vec()));
    Ok(())
}

#[tokio::test]
async fn restore_requires_stopped_server() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock, 5);
    let record = backups.backup(None).await?;

    for state in [
        SupervisorState::Running,
        SupervisorState::Starting,
        SupervisorState::CrashRestarting,
    ] {
        match backups.restore(&record.id, state).await {
            Err(ObsidiaError::InvalidState { expected, actual }) => {
                assert_eq!(expected, SupervisorState::Stopped);
                assert_eq!(actual, state);
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }
    assert_eq!(fs.contents("srv/world/level.dat"), Some(b"level-v1".to_vec()));
    Ok(())
}

#[tokio::test]
async fn restore_replaces_the_world() -> TestResult {
    init_tracing();
    let fs = mock_world();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let backups = manager(&fs, clock, 5);
    let record = backups.backup(None).await?;

    fs.add_file("srv/world/level.dat", "level-v2");
    fs.add_file("srv/world/new-file.txt", "added later");

    backups.restore(&record.id, SupervisorState::Stopped).await?;
    assert_eq!(fs.contents("srv/world/level.dat"), Some(b"level-v1".to_vec()));
    assert!(!fs.exists(Path::new("srv/world/new-file.txt")));
    // The backup itself is kept.
    assert_eq!(ids(&backups.list()?), vec![record.id]);
    Ok(())
}

#[test]
fn evictions_pick_oldest_timestamps_only() {
    let record = |id: &str| BackupRecord::from_path(PathBuf::from("backups").join(id)).unwrap();
    let records = vec![record("300"), record("100"), record("manual"), record("200")];

    let evicted: Vec<String> = select_evictions(&records, 2).into_iter().map(|r| r.id).collect();
    assert_eq!(evicted, vec!["100", "200"]);

    assert!(select_evictions(&records, 4).is_empty());
    assert_eq!(select_evictions(&records, 1).len(), 3);
}

#[test]
fn backup_ids_must_be_plain_names() {
    assert!(is_valid_id("1704164400"));
    assert!(!is_valid_id(""));
    assert!(!is_valid_id(".."));
    assert!(!is_valid_id("a/b"));
    assert!(!is_valid_id("/abs"));
}

#[tokio::test]
async fn supervisor_backup_toggles_autosave_on_the_real_filesystem() -> TestResult {
    init_tracing();
    let clock = Arc::new(ManualClock::new(datetime(2024, 1, 2, 3, 0, 0)));
    let server = FakeServer::with_config(
        ServerConfigBuilder::new()
            .shell_script(FAKE_SERVER_SCRIPT)
            .max_backups(2),
    );
    let sup = server.supervisor(clock.clone());
    let listener = RecordingListener::new();
    sup.subscribe(Arc::new(listener.clone()));

    sup.start_server()?;
    let process = sup.process().ok_or("no process")?;
    eventually("ready", || process.is_ready()).await;

    for _ in 0..3 {
        sup.backup_now().await?;
        clock.advance(ChronoDuration::seconds(1));
    }
    eventually("autosave re-enabled", || listener.contains("> save-on")).await;
    assert!(listener.contains("> save-off"));

    let listed = sup.list_backups()?;
    assert_eq!(listed.len(), 2);
    let mut on_disk: Vec<String> = fs::read_dir(server.backups())?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    on_disk.sort();
    assert_eq!(on_disk, ids(&listed));

    let newest = server.backups().join(&listed[1].id);
    assert_eq!(fs::read(newest.join("level.dat"))?, b"level-v1");
    assert!(!newest.join("session.lock").exists());

    // Restore is refused while running, allowed once stopped.
    assert!(matches!(
        sup.restore_backup(&listed[0].id).await,
        Err(ObsidiaError::InvalidState { .. })
    ));
    sup.shutdown(Duration::from_secs(5)).await;

    fs::write(server.world().join("level.dat"), b"level-v2")?;
    sup.restore_backup(&listed[0].id).await?;
    assert_eq!(fs::read(server.world().join("level.dat"))?, b"level-v1");
    Ok(())
}
