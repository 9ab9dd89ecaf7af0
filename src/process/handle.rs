// src/process/handle.rs

//! One managed OS child process and its console I/O.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::{ObsidiaError, Result};
use crate::logs::{LogListener, LogMultiplexer, SubscriptionId};

use super::launch::LaunchSpec;
use super::reader::{spawn_stderr_drain, spawn_stdout_reader};

/// How a process instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl From<ExitStatus> for ExitRecord {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

impl fmt::Display for ExitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Flags shared between the handle and its background tasks.
///
/// Every spawn bumps `generation`; background tasks only touch the flags
/// while their own generation is current, so a late reader from a previous
/// instance cannot clear the flags of a new one.
#[derive(Debug, Default)]
pub(crate) struct LiveState {
    generation: AtomicU64,
    active: AtomicBool,
    ready: AtomicBool,
    pid: AtomicU32,
    started_at: Mutex<Option<Instant>>,
}

impl LiveState {
    fn begin(&self, pid: Option<u32>) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ready.store(false, Ordering::SeqCst);
        self.pid.store(pid.unwrap_or(0), Ordering::SeqCst);
        *self.started() = Some(Instant::now());
        self.active.store(true, Ordering::SeqCst);
        generation
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Returns whether the flag was set (false for a stale generation).
    pub(crate) fn mark_ready(&self, generation: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.ready.store(true, Ordering::SeqCst);
        true
    }

    pub(crate) fn mark_exited(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.active.store(false, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        self.pid.store(0, Ordering::SeqCst);
        *self.started() = None;
    }

    fn started(&self) -> MutexGuard<'_, Option<Instant>> {
        self.started_at.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Per-spawn plumbing.
struct Instance {
    stdin: Arc<AsyncMutex<Option<ChildStdin>>>,
    kill: Option<oneshot::Sender<()>>,
    exit: watch::Receiver<Option<ExitRecord>>,
}

/// Owns one managed server process: its stdin, its stdout reader, and the
/// task waiting for it to exit.
///
/// At most one OS process is live per handle; `start` on an active handle
/// does nothing.
pub struct ProcessHandle {
    name: Arc<str>,
    launch: LaunchSpec,
    readiness_marker: String,
    logs: Arc<LogMultiplexer>,
    live: Arc<LiveState>,
    instance: Mutex<Option<Instance>>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("name", &self.name)
            .field("launch", &self.launch)
            .field("active", &self.is_active())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    pub fn new(
        name: impl Into<Arc<str>>,
        launch: LaunchSpec,
        readiness_marker: impl Into<String>,
        logs: Arc<LogMultiplexer>,
    ) -> Self {
        Self {
            name: name.into(),
            launch,
            readiness_marker: readiness_marker.into(),
            logs,
            live: Arc::new(LiveState::default()),
            instance: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn launch(&self) -> &LaunchSpec {
        &self.launch
    }

    pub fn logs(&self) -> &Arc<LogMultiplexer> {
        &self.logs
    }

    /// The full command line, as it would be spawned.
    pub fn launch_command(&self) -> String {
        self.launch.command_line()
    }

    /// Register a console listener on this process's multiplexer.
    pub fn subscribe(&self, listener: Arc<dyn LogListener>) -> SubscriptionId {
        self.logs.subscribe(listener)
    }

    /// Spawn the process in its directory and attach the background reader.
    ///
    /// Returns as soon as the OS process exists; readiness is reported later
    /// through [`is_ready`](Self::is_ready).
    pub fn start(&self) -> Result<()> {
        if self.is_active() {
            debug!(server = %self.name, "start requested but process already active");
            return Ok(());
        }

        let mut cmd = Command::new(&self.launch.executable);
        cmd.args(self.launch.argv())
            .current_dir(&self.launch.directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ObsidiaError::SpawnError {
            server: self.name.to_string(),
            source,
        })?;

        let pid = child.id();
        let generation = self.live.begin(pid);
        info!(
            server = %self.name,
            pid,
            cmd = %self.launch.command_line(),
            dir = ?self.launch.directory,
            "server process spawned"
        );

        let stdin = child.stdin.take();

        match child.stdout.take() {
            Some(stdout) => {
                spawn_stdout_reader(
                    stdout,
                    Arc::clone(&self.live),
                    generation,
                    Arc::clone(&self.logs),
                    self.readiness_marker.clone(),
                );
            }
            None => warn!(server = %self.name, "no stdout pipe; console lines will be lost"),
        }

        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(stderr, Arc::clone(&self.name));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(wait_for_exit(
            child,
            kill_rx,
            exit_tx,
            Arc::clone(&self.live),
            generation,
            Arc::clone(&self.name),
        ));

        *self.lock_instance() = Some(Instance {
            stdin: Arc::new(AsyncMutex::new(stdin)),
            kill: Some(kill_tx),
            exit: exit_rx,
        });

        Ok(())
    }

    /// Write one line (a newline is appended) to the process's console and
    /// flush it.
    ///
    /// Failures are logged and published to listeners as a notice; the error
    /// is returned for callers that care but is never fatal.
    pub async fn write(&self, line: &str) -> Result<()> {
        let stdin = self.lock_instance().as_ref().map(|i| Arc::clone(&i.stdin));

        let result = match stdin {
            Some(stdin) => {
                let mut guard = stdin.lock().await;
                match guard.as_mut() {
                    Some(pipe) => {
                        let written = async {
                            pipe.write_all(format!("{line}\n").as_bytes()).await?;
                            pipe.flush().await
                        }
                        .await;
                        written.map_err(ObsidiaError::from)
                    }
                    None => Err(ObsidiaError::ProcessNotRunning(self.name.to_string())),
                }
            }
            None => Err(ObsidiaError::ProcessNotRunning(self.name.to_string())),
        };

        match &result {
            Ok(()) => debug!(server = %self.name, command = %line, "wrote to server console"),
            Err(e) => {
                warn!(server = %self.name, command = %line, error = %e, "console write failed");
                self.logs.notify(format!("Write failed: {e}")).await;
            }
        }
        result
    }

    /// True iff a process was spawned and has not exited.
    pub fn is_active(&self) -> bool {
        self.live.is_active()
    }

    /// True once the readiness marker has been seen for the current process.
    pub fn is_ready(&self) -> bool {
        self.live.is_ready()
    }

    pub fn pid(&self) -> Option<u32> {
        match self.live.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Time since the current process was spawned; zero when not running.
    pub fn uptime(&self) -> Duration {
        let started = *self.live.started();
        started.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Wait until the current process exits. `None` if nothing was spawned.
    pub async fn wait_exit(&self) -> Option<ExitRecord> {
        let mut exit = self.lock_instance().as_ref()?.exit.clone();
        let waited = exit.wait_for(|e| e.is_some()).await.map(|r| *r);
        match waited {
            Ok(record) => record,
            Err(_) => *exit.borrow(),
        }
    }

    /// Ask the process to shut down cooperatively and wait for it to exit.
    ///
    /// A process that has already exited counts as stopped. If it is still
    /// running after `grace`, [`ObsidiaError::StopTimeout`] is returned and
    /// the process is left running; escalating to [`kill`](Self::kill) is the
    /// caller's call. Must not be called from the stdout reader.
    pub async fn stop(&self, shutdown_command: &str, grace: Duration) -> Result<()> {
        if !self.is_active() {
            debug!(server = %self.name, "stop requested but process already exited");
            return Ok(());
        }

        if let Err(e) = self.write(shutdown_command).await {
            debug!(
                server = %self.name,
                error = %e,
                "shutdown command not delivered; waiting for exit anyway"
            );
        }

        match timeout(grace, self.wait_exit()).await {
            Ok(_) => Ok(()),
            Err(_) => Err(ObsidiaError::StopTimeout {
                server: self.name.to_string(),
                secs: grace.as_secs(),
            }),
        }
    }

    /// Terminate the process immediately.
    ///
    /// Unsafe for the server's data: anything it was writing to disk at that
    /// moment may be left truncated. Only for operators forcing a stuck
    /// server down. Returns whether a kill was requested.
    pub fn kill(&self) -> bool {
        let sender = self.lock_instance().as_mut().and_then(|i| i.kill.take());
        match sender {
            Some(tx) => {
                warn!(server = %self.name, "kill requested");
                tx.send(()).is_ok()
            }
            None => false,
        }
    }

    fn lock_instance(&self) -> MutexGuard<'_, Option<Instance>> {
        self.instance.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Own the child until it exits (or a kill is requested), then publish the
/// exit record.
async fn wait_for_exit(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<ExitRecord>>,
    live: Arc<LiveState>,
    generation: u64,
    server: Arc<str>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        requested = &mut kill_rx => {
            if requested.is_ok()
                && let Err(e) = child.start_kill()
            {
                warn!(server = %server, error = %e, "failed to kill server process");
            }
            child.wait().await
        }
    };

    let record = match status {
        Ok(status) => ExitRecord::from(status),
        Err(e) => {
            warn!(server = %server, error = %e, "failed waiting for server process");
            ExitRecord {
                code: None,
                success: false,
            }
        }
    };

    info!(server = %server, exit = %record, "server process exited");
    live.mark_exited(generation);
    let _ = exit_tx.send(Some(record));
}
