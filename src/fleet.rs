// src/fleet.rs

//! Discovery of server directories and the set of supervisors built from
//! them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::errors::{ObsidiaError, Result};
use crate::fs::FileSystem;
use crate::logs::LogListener;
use crate::supervisor::{ServerStatus, Supervisor};

/// Sub-directories of `root` that contain at least one `*.jar`, sorted by
/// path. A missing root yields nothing.
pub fn discover_servers(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(root) {
        warn!(root = ?root, "servers directory does not exist");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for dir in fs.read_dir(root)? {
        if !fs.is_dir(&dir) {
            continue;
        }
        let has_jar = fs.read_dir(&dir)?.iter().any(|entry| {
            fs.is_file(entry)
                && entry
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
        });
        if has_jar {
            found.push(dir);
        }
    }
    found.sort();
    Ok(found)
}

/// Every supervised server, keyed by name.
#[derive(Debug, Default)]
pub struct Fleet {
    servers: Vec<Supervisor>,
}

impl Fleet {
    pub fn new(servers: Vec<Supervisor>) -> Self {
        Self { servers }
    }

    /// Discover servers under `root` and build a supervisor for each.
    ///
    /// A server whose configuration cannot be loaded is skipped with a
    /// warning; the others still run. Duplicate names keep the first.
    pub fn load(root: &Path, fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut servers: Vec<Supervisor> = Vec::new();

        for dir in discover_servers(fs.as_ref(), root)? {
            match Supervisor::load(&dir, Arc::clone(&fs), Arc::clone(&clock)) {
                Ok(sup) => {
                    if servers.iter().any(|s| s.name() == sup.name()) {
                        warn!(server = %sup.name(), dir = ?dir, "duplicate server name; skipping");
                        continue;
                    }
                    info!(server = %sup.name(), dir = ?dir, "server discovered");
                    servers.push(sup);
                }
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "failed to load server config; skipping");
                }
            }
        }

        Ok(Self { servers })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Supervisor> {
        self.servers.iter()
    }

    pub fn get(&self, name: &str) -> Result<&Supervisor> {
        self.servers
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ObsidiaError::ServerNotFound(name.to_string()))
    }

    /// Start every server; failures are logged. Returns how many started.
    pub fn start_all(&self) -> usize {
        let mut started = 0;
        for sup in &self.servers {
            match sup.start_server() {
                Ok(()) => started += 1,
                Err(e) => warn!(server = %sup.name(), error = %e, "failed to start server"),
            }
        }
        started
    }

    pub fn subscribe_all(&self, listener: Arc<dyn LogListener>) {
        for sup in &self.servers {
            sup.subscribe(Arc::clone(&listener));
        }
    }

    pub fn statuses(&self) -> Vec<ServerStatus> {
        self.servers.iter().map(Supervisor::status).collect()
    }

    /// Shut every server down concurrently, each bounded by `grace`.
    pub async fn shutdown_all(&self, grace: Duration) {
        let mut set = JoinSet::new();
        for sup in &self.servers {
            let sup = sup.clone();
            set.spawn(async move { sup.shutdown(grace).await });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "shutdown task failed");
            }
        }
        info!(servers = self.servers.len(), "all servers shut down");
    }
}
