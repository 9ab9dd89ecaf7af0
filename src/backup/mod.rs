// src/backup/mod.rs

//! Timestamped copies of a server's data directory.
//!
//! - [`record`] lists backups and decides which ones retention evicts.
//! - [`manager`] runs backups and restores against the [`FileSystem`]
//!   seam, coordinating autosave with the running process.
//!
//! [`FileSystem`]: crate::fs::FileSystem

pub mod manager;
pub mod record;

pub use manager::BackupManager;
pub use record::{is_valid_id, list_records, select_evictions, BackupRecord};
