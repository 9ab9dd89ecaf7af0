// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::supervisor::SupervisorState;

#[derive(Error, Debug)]
pub enum ObsidiaError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Invalid schedule '{input}': {reason}")]
    ScheduleError { input: String, reason: String },

    #[error("Server '{0}' has no running process")]
    ProcessNotRunning(String),

    #[error("Failed to spawn server '{server}': {source}")]
    SpawnError {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server '{server}' did not exit within {secs}s of the shutdown command")]
    StopTimeout { server: String, secs: u64 },

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Operation requires server state {expected:?}, but it is {actual:?}")]
    InvalidState {
        expected: SupervisorState,
        actual: SupervisorState,
    },

    #[error("A backup is currently in progress")]
    BackupInProgress,

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Invalid command: {0}")]
    CommandError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ObsidiaError>;
