// src/backup/manager.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::BackupPolicy;
use crate::errors::{ObsidiaError, Result};
use crate::fs::{copy_dir_recursive, FileSystem};
use crate::logs::LogMultiplexer;
use crate::process::ProcessHandle;
use crate::supervisor::SupervisorState;

use super::record::{is_valid_id, list_records, select_evictions, BackupRecord};

const SAVE_OFF: &str = "save-off";
const SAVE_ON: &str = "save-on";

/// Resets the in-progress flag when a backup or restore ends, however it
/// ends.
struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Creates, rotates and restores timestamped copies of one server's data
/// directory.
///
/// Layout: `<server_dir>/<data_dir>` is copied to
/// `<server_dir>/<root>/<unix timestamp>`. Only one backup or restore runs at
/// a time; a second request fails with [`ObsidiaError::BackupInProgress`].
pub struct BackupManager {
    server: Arc<str>,
    data_dir: PathBuf,
    root: PathBuf,
    max_backups: usize,
    exclude: Vec<String>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    logs: Arc<LogMultiplexer>,
    in_progress: AtomicBool,
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("server", &self.server)
            .field("data_dir", &self.data_dir)
            .field("root", &self.root)
            .field("max_backups", &self.max_backups)
            .field("in_progress", &self.is_in_progress())
            .finish_non_exhaustive()
    }
}

impl BackupManager {
    /// `data_dir_name` is the world folder inside `server_dir`
    /// (`level-name` in `server.properties`).
    pub fn new(
        server_dir: &Path,
        data_dir_name: &str,
        policy: &BackupPolicy,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        logs: Arc<LogMultiplexer>,
    ) -> Self {
        Self {
            server: Arc::from(logs.server()),
            data_dir: server_dir.join(data_dir_name),
            root: server_dir.join(&policy.root),
            max_backups: policy.max_backups.max(1),
            exclude: policy.exclude.clone(),
            fs,
            clock,
            logs,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Existing backups, oldest first. Empty when the root does not exist.
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        Ok(list_records(self.fs.as_ref(), &self.root)?)
    }

    /// Copy the data directory into a new timestamped backup.
    ///
    /// Autosave is switched off through `console` for the duration of the
    /// copy when the process is running; failing to do so is logged and the
    /// backup goes ahead. Oldest backups are evicted first so that at most
    /// `max_backups` remain once this one exists. Progress and failures are
    /// published to the log listeners.
    pub async fn backup(&self, console: Option<&ProcessHandle>) -> Result<BackupRecord> {
        let _guard = self.begin()?;
        let console = console.filter(|p| p.is_active());

        self.logs.notify("[Backup] Starting backup...").await;
        info!(server = %self.server, data_dir = ?self.data_dir, "backup started");

        if let Some(process) = console
            && let Err(e) = process.write(SAVE_OFF).await
        {
            warn!(server = %self.server, error = %e, "could not disable autosave; backing up anyway");
        }

        let result = self.copy_to_new_backup().await;

        if let Some(process) = console
            && let Err(e) = process.write(SAVE_ON).await
        {
            warn!(server = %self.server, error = %e, "could not re-enable autosave");
        }

        match &result {
            Ok((record, files)) => {
                info!(server = %self.server, id = %record.id, files, "backup complete");
                self.logs
                    .notify(format!("[Backup] Backup {} complete ({files} files).", record.id))
                    .await;
            }
            Err(e) => {
                warn!(server = %self.server, error = %e, "backup failed");
                self.logs.notify(format!("[Backup] Backup failed: {e}")).await;
            }
        }

        result.map(|(record, _)| record)
    }

    /// Replace the data directory with the contents of backup `id`.
    ///
    /// Only allowed while the server is stopped. An unknown id, or one that
    /// is not a plain directory name, leaves the data directory untouched.
    pub async fn restore(&self, id: &str, state: SupervisorState) -> Result<()> {
        if state != SupervisorState::Stopped {
            return Err(ObsidiaError::InvalidState {
                expected: SupervisorState::Stopped,
                actual: state,
            });
        }
        let _guard = self.begin()?;

        if !is_valid_id(id) {
            return Err(ObsidiaError::BackupNotFound(id.to_string()));
        }
        let source = self.root.join(id);
        if !self.fs.is_dir(&source) {
            return Err(ObsidiaError::BackupNotFound(id.to_string()));
        }

        self.logs
            .notify(format!("[Backup] Restoring backup {id}..."))
            .await;
        info!(server = %self.server, id, "restore started");

        let fs = Arc::clone(&self.fs);
        let data_dir = self.data_dir.clone();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            if fs.exists(&data_dir) {
                fs.remove_dir_all(&data_dir)?;
            }
            copy_dir_recursive(fs.as_ref(), &source, &data_dir, &[])
        })
        .await
        .map_err(|e| anyhow!("restore task failed: {e}"))
        .and_then(|r| r)
        .map_err(ObsidiaError::from);

        match &result {
            Ok(files) => {
                info!(server = %self.server, id, files, "restore complete");
                self.logs
                    .notify(format!("[Backup] Restored backup {id}."))
                    .await;
            }
            Err(e) => {
                warn!(server = %self.server, id, error = %e, "restore failed");
                self.logs
                    .notify(format!("[Backup] Restore of {id} failed: {e}"))
                    .await;
            }
        }
        result.map(|_| ())
    }

    fn begin(&self) -> Result<InProgress<'_>> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(ObsidiaError::BackupInProgress);
        }
        Ok(InProgress(&self.in_progress))
    }

    /// Rotation and copy, off the async runtime.
    async fn copy_to_new_backup(&self) -> Result<(BackupRecord, usize)> {
        let fs = Arc::clone(&self.fs);
        let data_dir = self.data_dir.clone();
        let root = self.root.clone();
        let exclude = self.exclude.clone();
        let max = self.max_backups;
        let id = self.clock.unix_timestamp().to_string();
        let server = Arc::clone(&self.server);

        tokio::task::spawn_blocking(move || -> anyhow::Result<(BackupRecord, usize)> {
            if !fs.is_dir(&data_dir) {
                return Err(anyhow!("data directory {:?} does not exist", data_dir));
            }

            let target = root.join(&id);
            if fs.exists(&target) {
                return Err(anyhow!("backup {id} already exists"));
            }

            let existing = list_records(fs.as_ref(), &root)?;
            for old in select_evictions(&existing, max) {
                debug!(server = %server, id = %old.id, "evicting old backup");
                fs.remove_dir_all(&old.path)
                    .with_context(|| format!("evicting backup {}", old.id))?;
            }

            fs.create_dir_all(&root)?;
            match copy_dir_recursive(fs.as_ref(), &data_dir, &target, &exclude) {
                Ok(files) => {
                    let record = BackupRecord::from_path(target)
                        .ok_or_else(|| anyhow!("invalid backup path"))?;
                    Ok((record, files))
                }
                Err(e) => {
                    if fs.exists(&target)
                        && let Err(cleanup) = fs.remove_dir_all(&target)
                    {
                        warn!(server = %server, error = %cleanup, "could not remove partial backup");
                    }
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| anyhow!("backup task failed: {e}"))?
        .map_err(ObsidiaError::from)
    }
}
