// src/backup/record.rs

use std::path::{Component, Path, PathBuf};

use anyhow::Result;

use crate::fs::FileSystem;

/// One directory under the backup root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Directory name; normally the Unix timestamp of its creation.
    pub id: String,
    /// `Some` when `id` parses as a timestamp. Only these take part in
    /// retention.
    pub timestamp: Option<i64>,
    pub path: PathBuf,
}

impl BackupRecord {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let id = path.file_name()?.to_str()?.to_string();
        let timestamp = id.parse::<i64>().ok();
        Some(Self {
            id,
            timestamp,
            path,
        })
    }
}

/// List every directory under `root`, oldest timestamp first; names that
/// are not timestamps come last, alphabetically. A missing root is an empty
/// list.
pub fn list_records(fs: &dyn FileSystem, root: &Path) -> Result<Vec<BackupRecord>> {
    if !fs.is_dir(root) {
        return Ok(Vec::new());
    }

    let mut records: Vec<BackupRecord> = fs
        .read_dir(root)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .filter_map(BackupRecord::from_path)
        .collect();

    records.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    Ok(records)
}

/// Which timestamped records to delete so that one more backup keeps the
/// count at or below `max`. Oldest first.
pub fn select_evictions(records: &[BackupRecord], max: usize) -> Vec<BackupRecord> {
    let mut timestamped: Vec<&BackupRecord> =
        records.iter().filter(|r| r.timestamp.is_some()).collect();
    timestamped.sort_by_key(|r| r.timestamp);

    let keep = max.saturating_sub(1);
    let excess = timestamped.len().saturating_sub(keep);
    timestamped.into_iter().take(excess).cloned().collect()
}

/// A backup id must be a single plain path component.
pub fn is_valid_id(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
