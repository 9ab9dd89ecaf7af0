// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleRule;

/// Site-wide configuration (`obsidia.toml` next to the binary by default).
///
/// ```toml
/// [servers]
/// directory = "servers"
/// start_all_on_startup = true
/// shutdown_timeout_secs = 120
/// ```
///
/// The `[servers]` section is required; its options are not.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub servers: ServersSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServersSection {
    /// Directory whose sub-directories are the managed servers.
    #[serde(default = "default_servers_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_true")]
    pub start_all_on_startup: bool,

    /// How long shutdown waits for all servers before killing them.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl ServersSection {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_servers_directory() -> PathBuf {
    PathBuf::from("servers")
}

fn default_shutdown_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

/// Per-server configuration as read from `<serverDir>/obsidia.toml`.
///
/// Every section and option is optional; anything missing is filled from
/// the defaults below and written back to the file.
///
/// ```toml
/// [server]
/// jar = "server.jar"
/// args = ["-Xmx2G"]
///
/// [restarts]
/// autorestart = true
/// schedule = "SMTWRFD 0400"
///
/// [backups]
/// enabled = true
/// schedule = "MWF 0300"
/// max_backups = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub restarts: RestartSection,

    #[serde(default)]
    pub backups: BackupSection,

    #[serde(default)]
    pub monitor: MonitorSection,
}

/// `[server]` section: how to launch and talk to the process.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSection {
    /// Display name; empty means "use the directory name".
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_jar")]
    pub jar: String,

    /// Program that runs the jar.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Arguments placed between the executable and `-jar`.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Appended after the jar name.
    #[serde(default = "default_headless_flag")]
    pub headless_flag: String,

    /// Output substring that marks the server as accepting connections.
    #[serde(default = "default_readiness_marker")]
    pub readiness_marker: String,

    /// Console command that asks the server to save and exit.
    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            jar: default_jar(),
            executable: default_executable(),
            args: default_args(),
            headless_flag: default_headless_flag(),
            readiness_marker: default_readiness_marker(),
            shutdown_command: default_shutdown_command(),
        }
    }
}

fn default_jar() -> String {
    "server.jar".to_string()
}

fn default_executable() -> String {
    "java".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-Xmx2G".to_string()]
}

fn default_headless_flag() -> String {
    "-nogui".to_string()
}

fn default_readiness_marker() -> String {
    "Done (".to_string()
}

fn default_shutdown_command() -> String {
    "stop".to_string()
}

/// `[restarts]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RestartSection {
    /// Restart on the weekly `schedule`.
    #[serde(default)]
    pub autorestart: bool,

    #[serde(default = "default_restart_schedule")]
    pub schedule: String,

    /// Respawn when the process exits without being asked to.
    #[serde(default = "default_true")]
    pub restart_on_crash: bool,

    /// Pause before a crash respawn.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

impl Default for RestartSection {
    fn default() -> Self {
        Self {
            autorestart: false,
            schedule: default_restart_schedule(),
            restart_on_crash: true,
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

fn default_restart_schedule() -> String {
    "SMTWRFD 0400".to_string()
}

fn default_restart_delay_secs() -> u64 {
    5
}

/// `[backups]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackupSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_backup_schedule")]
    pub schedule: String,

    /// Retention: never more than this many backups after a backup completes.
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Backup root, relative to the server directory.
    #[serde(default = "default_backup_root")]
    pub root: String,

    /// File names skipped when copying the data directory.
    #[serde(default = "default_backup_exclude")]
    pub exclude: Vec<String>,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: default_backup_schedule(),
            max_backups: default_max_backups(),
            root: default_backup_root(),
            exclude: default_backup_exclude(),
        }
    }
}

fn default_backup_schedule() -> String {
    "SMTWRFD 0300".to_string()
}

fn default_max_backups() -> usize {
    5
}

fn default_backup_root() -> String {
    "backups".to_string()
}

fn default_backup_exclude() -> Vec<String> {
    vec!["session.lock".to_string()]
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MonitorSection {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Grace period for a cooperative stop before obsidia gives up waiting.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_stop_timeout_secs() -> u64 {
    90
}

/// Validated per-server configuration.
///
/// Constructed via `ServerConfig::try_from(RawServerConfig)`; schedules are
/// parsed and features whose schedule has no weekdays are switched off.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub restarts: RestartPolicy,
    pub backups: BackupPolicy,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// `Some` only when autorestart is enabled with a non-empty schedule.
    pub schedule: Option<ScheduleRule>,
    pub restart_on_crash: bool,
    pub restart_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct BackupPolicy {
    /// `Some` only when scheduled backups are enabled with a non-empty schedule.
    pub schedule: Option<ScheduleRule>,
    pub max_backups: usize,
    pub root: PathBuf,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub stop_timeout: Duration,
}

impl ServerConfig {
    pub(crate) fn new_unchecked(
        server: ServerSection,
        restarts: RestartPolicy,
        backups: BackupPolicy,
        monitor: MonitorSettings,
    ) -> Self {
        Self {
            server,
            restarts,
            backups,
            monitor,
        }
    }
}
