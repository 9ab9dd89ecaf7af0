// src/supervisor/monitor.rs

//! The async shell of the supervisor: one task per run that watches the
//! current process, polls the restart and backup schedules, and applies the
//! exit decision when the process goes away.

use std::sync::Arc;

use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::process::{ExitRecord, ProcessHandle};
use crate::schedule::{describe_countdown, ScheduleSignal, ScheduleTracker};

use super::state::{decide_on_exit, ExitDecision, SupervisorState};
use super::Inner;

/// Supervise `process` and every respawn that follows it until the exit
/// decision is to stop.
pub(crate) async fn supervise(inner: Arc<Inner>, mut process: Arc<ProcessHandle>) {
    loop {
        let exit = monitor(&inner, &process).await;
        let flags = inner.flags();
        let decision = decide_on_exit(&flags, inner.config.restarts.restart_on_crash);
        let exit_text = exit.map_or_else(|| "unknown exit".to_string(), |e| e.to_string());
        debug!(server = %inner.name, ?flags, ?decision, exit = %exit_text, "process exited");

        inner.set_state(decision.state());
        match decision {
            ExitDecision::Stop => {
                inner.update_flags(|f| f.should_run = false);
                info!(server = %inner.name, exit = %exit_text, "server stopped");
                inner.logs.notify("Server stopped.").await;
                return;
            }
            ExitDecision::Restart => {
                inner.update_flags(|f| f.reset_for_respawn());
                info!(server = %inner.name, "restarting server");
            }
            ExitDecision::CrashRestart => {
                inner.update_flags(|f| f.reset_for_respawn());
                let delay = inner.config.restarts.restart_delay;
                warn!(server = %inner.name, exit = %exit_text, ?delay, "server crashed; restarting");
                inner
                    .logs
                    .notify(format!(
                        "Server exited unexpectedly ({exit_text}); restarting in {}s.",
                        delay.as_secs()
                    ))
                    .await;
                sleep(delay).await;

                // A stop may have arrived during the delay.
                let flags = inner.flags();
                if !flags.should_run || flags.explicit_stop {
                    inner.update_flags(|f| f.should_run = false);
                    inner.set_state(SupervisorState::Stopped);
                    info!(server = %inner.name, "stop requested during restart delay");
                    inner.logs.notify("Server stopped.").await;
                    return;
                }
            }
        }

        inner.set_state(SupervisorState::Starting);
        match inner.spawn_process() {
            Ok(next) => {
                process = next;
                inner.set_state(SupervisorState::Running);
                inner.logs.notify("Server restarted.").await;
            }
            Err(e) => {
                error!(server = %inner.name, error = %e, "respawn failed");
                inner.update_flags(|f| f.should_run = false);
                inner.set_state(SupervisorState::Stopped);
                inner.logs.notify(format!("Restart failed: {e}")).await;
                return;
            }
        }
    }
}

/// Poll schedules on a fixed interval until `process` exits.
async fn monitor(inner: &Arc<Inner>, process: &Arc<ProcessHandle>) -> Option<ExitRecord> {
    let mut restart = inner.config.restarts.schedule.map(ScheduleTracker::new);
    let mut backup = inner.config.backups.schedule.map(ScheduleTracker::new);
    let mut stop_deadline: Option<Instant> = None;

    let mut ticker = interval(inner.config.monitor.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exited = process.wait_exit();
    tokio::pin!(exited);

    loop {
        tokio::select! {
            exit = &mut exited => return exit,
            _ = ticker.tick() => {}
        }

        if !process.is_active() {
            continue;
        }

        if let Some(deadline) = stop_deadline
            && Instant::now() >= deadline
        {
            warn!(server = %inner.name, "scheduled stop timed out; killing process");
            inner.logs.notify("Server did not stop in time; killing it.").await;
            process.kill();
            stop_deadline = None;
        }

        let now = inner.clock.now();

        if let Some(tracker) = restart.as_mut() {
            match tracker.observe(now) {
                Some(ScheduleSignal::Warning(secs)) => {
                    announce(process, &format!("Server restarting in {}.", describe_countdown(secs)))
                        .await;
                }
                Some(ScheduleSignal::Crossed) if stop_deadline.is_none() => {
                    info!(server = %inner.name, "scheduled restart reached");
                    announce(process, "Server restarting now.").await;
                    inner.update_flags(|f| f.restart_scheduled = true);
                    if let Err(e) = process.write(&inner.config.server.shutdown_command).await {
                        warn!(server = %inner.name, error = %e, "scheduled stop not delivered");
                    }
                    stop_deadline = Some(Instant::now() + inner.config.monitor.stop_timeout);
                }
                Some(ScheduleSignal::Crossed) | None => {}
            }
        }

        if let Some(tracker) = backup.as_mut() {
            match tracker.observe(now) {
                Some(ScheduleSignal::Warning(secs)) => {
                    announce(process, &format!("Backup starting in {}.", describe_countdown(secs)))
                        .await;
                }
                Some(ScheduleSignal::Crossed) => {
                    info!(server = %inner.name, "scheduled backup reached");
                    spawn_backup(Arc::clone(inner), Arc::clone(process));
                }
                None => {}
            }
        }
    }
}

/// Run a backup off the monitor task so exit detection keeps going.
fn spawn_backup(inner: Arc<Inner>, process: Arc<ProcessHandle>) {
    tokio::spawn(async move {
        announce(&process, "Starting backup...").await;
        match inner.backups.backup(Some(process.as_ref())).await {
            Ok(record) => {
                announce(&process, "Backup complete.").await;
                debug!(server = %inner.name, id = %record.id, "scheduled backup finished");
            }
            Err(e) => {
                warn!(server = %inner.name, error = %e, "scheduled backup failed");
            }
        }
    });
}

/// Broadcast a message to players through the server console. Best effort.
async fn announce(process: &ProcessHandle, message: &str) {
    if process.is_active() {
        let _ = process.write(&format!("say {message}")).await;
    }
}
