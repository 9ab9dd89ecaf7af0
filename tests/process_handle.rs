// tests/process_handle.rs

mod common;
use crate::common::{
    eventually, init_tracing, with_timeout, RecordingListener, TestResult, FAKE_SERVER_SCRIPT,
    STUBBORN_SERVER_SCRIPT,
};

use std::sync::Arc;
use std::time::Duration;

use obsidia::errors::ObsidiaError;
use obsidia::logs::LogMultiplexer;
use obsidia::process::{LaunchSpec, ProcessHandle};
use tempfile::TempDir;

fn shell(dir: &TempDir, script: &str) -> LaunchSpec {
    LaunchSpec {
        directory: dir.path().to_path_buf(),
        executable: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        jar: "server.jar".to_string(),
        headless_flag: "-nogui".to_string(),
    }
}

fn handle(dir: &TempDir, script: &str) -> ProcessHandle {
    ProcessHandle::new(
        "test",
        shell(dir, script),
        "Done (",
        Arc::new(LogMultiplexer::new("test")),
    )
}

#[test]
fn launch_command_places_jar_and_flag_last() {
    let spec = LaunchSpec {
        directory: "srv".into(),
        executable: "java".to_string(),
        args: vec!["-Xmx2G".to_string(), "-Xms1G".to_string()],
        jar: "paper.jar".to_string(),
        headless_flag: "-nogui".to_string(),
    };
    assert_eq!(spec.command_line(), "java -Xmx2G -Xms1G -jar paper.jar -nogui");

    let no_flag = LaunchSpec {
        headless_flag: String::new(),
        ..spec
    };
    assert_eq!(no_flag.argv(), vec!["-Xmx2G", "-Xms1G", "-jar", "paper.jar"]);
}

#[tokio::test]
async fn output_lines_reach_every_listener_in_order() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, "printf 'a\\nb\\nc\\n'; sleep 1");
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    process.subscribe(Arc::new(first.clone()));
    process.subscribe(Arc::new(second.clone()));

    process.start()?;
    with_timeout(process.wait_exit()).await;

    eventually("three lines each", || {
        first.console_lines().len() == 3 && second.console_lines().len() == 3
    })
    .await;
    assert_eq!(first.console_lines(), vec!["a", "b", "c"]);
    assert_eq!(second.console_lines(), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn readiness_marker_sets_ready_and_exit_clears_it() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, FAKE_SERVER_SCRIPT);
    assert!(!process.is_active());
    assert_eq!(process.uptime(), Duration::ZERO);

    process.start()?;
    assert!(process.is_active());
    assert!(process.pid().is_some());

    eventually("ready", || process.is_ready()).await;

    process.stop("stop", Duration::from_secs(5)).await?;
    assert!(!process.is_active());
    assert!(!process.is_ready());
    assert_eq!(process.pid(), None);
    assert_eq!(process.uptime(), Duration::ZERO);
    Ok(())
}

#[tokio::test]
async fn writes_arrive_on_the_child_console() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, FAKE_SERVER_SCRIPT);
    let listener = RecordingListener::new();
    process.subscribe(Arc::new(listener.clone()));
    process.start()?;

    process.write("say hello").await?;
    process.write("list").await?;

    eventually("echoed commands", || listener.contains("> list")).await;
    let lines = listener.console_lines();
    let hello = lines.iter().position(|l| l == "> say hello");
    let list = lines.iter().position(|l| l == "> list");
    assert!(hello.is_some() && hello < list, "lines: {lines:?}");

    process.stop("stop", Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn exit_code_is_reported() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, FAKE_SERVER_SCRIPT);
    process.start()?;

    process.write("crash").await?;
    let record = with_timeout(process.wait_exit()).await.ok_or("no exit record")?;
    assert_eq!(record.code, Some(3));
    assert!(!record.success);
    Ok(())
}

#[tokio::test]
async fn write_after_exit_fails_and_notifies_listeners() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, "echo bye");
    let listener = RecordingListener::new();
    process.subscribe(Arc::new(listener.clone()));

    // Never started.
    assert!(matches!(
        process.write("list").await,
        Err(ObsidiaError::ProcessNotRunning(_))
    ));

    process.start()?;
    with_timeout(process.wait_exit()).await;
    // Give the pipe a moment to be torn down.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut failed = false;
    for _ in 0..5 {
        if process.write("list").await.is_err() {
            failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(failed, "write to an exited process should fail");
    eventually("failure notice", || listener.contains("Write failed")).await;
    Ok(())
}

#[tokio::test]
async fn stop_on_an_exited_process_is_ok() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, "exit 0");
    process.start()?;
    with_timeout(process.wait_exit()).await;

    process.stop("stop", Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn stop_times_out_then_kill_terminates() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, STUBBORN_SERVER_SCRIPT);
    process.start()?;
    eventually("ready", || process.is_ready()).await;

    let result = process.stop("stop", Duration::from_millis(300)).await;
    assert!(matches!(result, Err(ObsidiaError::StopTimeout { .. })));
    assert!(process.is_active());

    assert!(process.kill());
    let record = with_timeout(process.wait_exit()).await.ok_or("no exit record")?;
    assert_eq!(record.code, None);
    assert!(!process.is_active());

    // Second kill has nothing to do.
    assert!(!process.kill());
    Ok(())
}

#[tokio::test]
async fn start_while_active_is_a_no_op() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let process = handle(&dir, FAKE_SERVER_SCRIPT);
    process.start()?;
    let pid = process.pid();

    process.start()?;
    assert_eq!(process.pid(), pid);

    process.stop("stop", Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut spec = shell(&dir, "");
    spec.executable = "definitely-not-a-real-binary-obsidia".to_string();
    let process = ProcessHandle::new("test", spec, "Done (", Arc::new(LogMultiplexer::new("test")));

    assert!(matches!(process.start(), Err(ObsidiaError::SpawnError { .. })));
    assert!(!process.is_active());
    Ok(())
}
