// src/supervisor/mod.rs

//! Lifecycle policy for one managed server.
//!
//! The pure exit decision lives in [`state`]; the async shell that spawns
//! processes, polls schedules and applies decisions is in [`monitor`].
//!
//! One [`Supervisor`] owns, for its whole life:
//! - the log multiplexer (listeners survive respawns);
//! - the backup manager;
//! - the current [`ProcessHandle`], re-created on every spawn;
//! - one supervise task per run, started by `start_server`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backup::{BackupManager, BackupRecord};
use crate::clock::Clock;
use crate::config::{load_server_config, ServerConfig, ServerProperties};
use crate::errors::{ObsidiaError, Result};
use crate::fs::FileSystem;
use crate::logs::{LogListener, LogMultiplexer, SubscriptionId};
use crate::process::{LaunchSpec, ProcessHandle};

pub mod monitor;
pub mod state;

pub use state::{decide_on_exit, ExitDecision, RunFlags, SupervisorState};

/// Relative location of the server's own log file.
pub const LATEST_LOG: &str = "logs/latest.log";

/// Point-in-time view of a supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    pub state: SupervisorState,
    pub active: bool,
    pub ready: bool,
    pub uptime_secs: u64,
    pub pid: Option<u32>,
    pub motd: Option<String>,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.state)?;
        if let Some(pid) = self.pid {
            write!(f, " (pid {pid}, up {}s", self.uptime_secs)?;
            if self.ready {
                write!(f, ", ready")?;
            }
            write!(f, ")")?;
        }
        if let Some(motd) = &self.motd {
            write!(f, " - {motd}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct RunControl {
    flags: RunFlags,
    process: Option<Arc<ProcessHandle>>,
    task: Option<JoinHandle<()>>,
}

pub(crate) struct Inner {
    name: Arc<str>,
    directory: PathBuf,
    config: ServerConfig,
    properties: ServerProperties,
    logs: Arc<LogMultiplexer>,
    backups: BackupManager,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileSystem>,
    state: watch::Sender<SupervisorState>,
    run: Mutex<RunControl>,
}

impl Inner {
    fn control(&self) -> MutexGuard<'_, RunControl> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn flags(&self) -> RunFlags {
        self.control().flags
    }

    pub(crate) fn update_flags(&self, f: impl FnOnce(&mut RunFlags)) {
        f(&mut self.control().flags);
    }

    pub(crate) fn process(&self) -> Option<Arc<ProcessHandle>> {
        self.control().process.clone()
    }

    pub(crate) fn set_state(&self, state: SupervisorState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(server = %self.name, from = %previous, to = %state, "state changed");
        }
    }

    pub(crate) fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Create a fresh process handle, spawn it and make it current.
    pub(crate) fn spawn_process(&self) -> Result<Arc<ProcessHandle>> {
        let process = Arc::new(ProcessHandle::new(
            Arc::clone(&self.name),
            LaunchSpec::from_config(&self.directory, &self.config.server),
            self.config.server.readiness_marker.clone(),
            Arc::clone(&self.logs),
        ));
        process.start()?;
        self.control().process = Some(Arc::clone(&process));
        Ok(process)
    }
}

/// Keeps one server alive, observable and backed up according to its
/// configuration.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.inner.name)
            .field("directory", &self.inner.directory)
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Build a supervisor for the server in `directory`. Nothing is spawned
    /// until [`start_server`](Self::start_server).
    pub fn new(
        directory: impl Into<PathBuf>,
        config: ServerConfig,
        properties: ServerProperties,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let directory = directory.into();
        let name: Arc<str> = if config.server.name.is_empty() {
            directory
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| directory.display().to_string())
                .into()
        } else {
            config.server.name.as_str().into()
        };

        let logs = Arc::new(LogMultiplexer::new(Arc::clone(&name)));
        let backups = BackupManager::new(
            &directory,
            &properties.level_name,
            &config.backups,
            Arc::clone(&fs),
            Arc::clone(&clock),
            Arc::clone(&logs),
        );
        let (state, _) = watch::channel(SupervisorState::Stopped);

        Self {
            inner: Arc::new(Inner {
                name,
                directory,
                config,
                properties,
                logs,
                backups,
                clock,
                fs,
                state,
                run: Mutex::new(RunControl::default()),
            }),
        }
    }

    /// Load `obsidia.toml` and `server.properties` from `directory`.
    pub fn load(
        directory: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let config = load_server_config(directory)?;
        let properties = ServerProperties::load(directory)?;
        Ok(Self::new(directory, config, properties, fs, clock))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn logs(&self) -> &Arc<LogMultiplexer> {
        &self.inner.logs
    }

    pub fn backups(&self) -> &BackupManager {
        &self.inner.backups
    }

    /// The current process handle, if one was ever spawned.
    pub fn process(&self) -> Option<Arc<ProcessHandle>> {
        self.inner.process()
    }

    /// Spawn the server and start supervising it.
    ///
    /// Returns once the OS process exists, without waiting for readiness.
    /// Does nothing unless the server is `Stopped`.
    pub fn start_server(&self) -> Result<()> {
        let inner = &self.inner;
        {
            let mut control = inner.control();
            let current = inner.state();
            if current != SupervisorState::Stopped {
                debug!(server = %inner.name, state = %current, "start requested but server is not stopped");
                return Ok(());
            }
            control.flags = RunFlags::running();
            if let Some(old) = control.task.take()
                && !old.is_finished()
            {
                old.abort();
            }
            inner.set_state(SupervisorState::Starting);
        }

        let process = match inner.spawn_process() {
            Ok(p) => p,
            Err(e) => {
                inner.update_flags(|f| f.should_run = false);
                inner.set_state(SupervisorState::Stopped);
                return Err(e);
            }
        };
        inner.set_state(SupervisorState::Running);
        info!(server = %inner.name, "server started");

        let task = tokio::spawn(monitor::supervise(Arc::clone(inner), process));
        inner.control().task = Some(task);
        Ok(())
    }

    /// Send one console command to the running process.
    ///
    /// Sending the shutdown command records an explicit stop first, so the
    /// resulting exit is never treated as a crash.
    pub async fn write(&self, command: &str) -> Result<()> {
        if command.trim() == self.inner.config.server.shutdown_command {
            self.inner.update_flags(|f| f.explicit_stop = true);
        }
        match self.inner.process() {
            Some(process) => process.write(command).await,
            None => {
                let err = ObsidiaError::ProcessNotRunning(self.inner.name.to_string());
                self.inner.logs.notify(format!("Write failed: {err}")).await;
                Err(err)
            }
        }
    }

    /// Ask the server to shut down; it stays down.
    pub async fn stop_server(&self) -> Result<()> {
        let shutdown = self.inner.config.server.shutdown_command.clone();
        self.write(&shutdown).await
    }

    /// Ask the server to shut down and come back up.
    pub async fn restart_server(&self) -> Result<()> {
        self.inner.update_flags(|f| {
            f.should_run = true;
            f.restart_scheduled = true;
        });
        self.inner.logs.notify("Restarting server...").await;
        match self.inner.process() {
            Some(process) => {
                process
                    .write(&self.inner.config.server.shutdown_command)
                    .await
            }
            None => Err(ObsidiaError::ProcessNotRunning(self.inner.name.to_string())),
        }
    }

    /// Terminate the process immediately and keep it down.
    ///
    /// Anything the server was writing at that moment may be lost.
    pub async fn kill_server(&self) -> bool {
        self.inner.update_flags(|f| {
            f.should_run = false;
            f.explicit_stop = true;
        });
        let killed = self.inner.process().is_some_and(|p| p.kill());
        if killed {
            self.inner.logs.notify("Server killed.").await;
        }
        killed
    }

    /// Stop the server and wait for supervision to end.
    ///
    /// Waits at most `grace` for a cooperative exit and the supervise task,
    /// then kills the process.
    pub async fn shutdown(&self, grace: Duration) {
        let inner = &self.inner;
        inner.update_flags(|f| {
            f.should_run = false;
            f.explicit_stop = true;
        });

        if let Some(process) = inner.process()
            && let Err(e) = process
                .stop(&inner.config.server.shutdown_command, grace)
                .await
        {
            warn!(server = %inner.name, error = %e, "cooperative stop failed; killing");
            process.kill();
        }

        let task = inner.control().task.take();
        if let Some(mut task) = task
            && timeout(grace, &mut task).await.is_err()
        {
            warn!(server = %inner.name, "supervise task did not finish in time; aborting");
            if let Some(process) = inner.process() {
                process.kill();
            }
            task.abort();
            inner.set_state(SupervisorState::Stopped);
        }
        info!(server = %inner.name, "server shut down");
    }

    /// Seconds since the current process spawned; 0 when not running.
    pub fn uptime(&self) -> u64 {
        self.inner
            .process()
            .map(|p| p.uptime().as_secs())
            .unwrap_or(0)
    }

    pub fn state(&self) -> SupervisorState {
        self.inner.state()
    }

    /// Receiver that sees every state change from now on.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.inner.state.subscribe()
    }

    /// Resolve once the supervisor is in `target`.
    pub async fn wait_for_state(&self, target: SupervisorState) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| *s == target).await;
    }

    pub fn status(&self) -> ServerStatus {
        let process = self.inner.process();
        let active = process.as_ref().is_some_and(|p| p.is_active());
        ServerStatus {
            name: self.inner.name.to_string(),
            state: self.inner.state(),
            active,
            ready: process.as_ref().is_some_and(|p| p.is_ready()),
            uptime_secs: self.uptime(),
            pid: process.as_ref().and_then(|p| p.pid()),
            motd: self.inner.properties.motd.clone(),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn LogListener>) -> SubscriptionId {
        self.inner.logs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.logs.unsubscribe(id)
    }

    /// Lines of the server's own `logs/latest.log`; empty if it does not
    /// exist yet.
    pub fn full_log(&self) -> Result<Vec<String>> {
        let path = self.inner.directory.join(LATEST_LOG);
        if !self.inner.fs.is_file(&path) {
            return Ok(Vec::new());
        }
        let contents = self.inner.fs.read_to_string(&path)?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Take a backup now, coordinating autosave with the running process.
    pub async fn backup_now(&self) -> Result<BackupRecord> {
        let process = self.inner.process();
        self.inner.backups.backup(process.as_deref()).await
    }

    pub fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        self.inner.backups.list()
    }

    /// Replace the data directory with backup `id`. The server must be
    /// stopped.
    pub async fn restore_backup(&self, id: &str) -> Result<()> {
        self.inner.backups.restore(id, self.inner.state()).await
    }

    /// Time source used for schedules and backup names.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }
}
