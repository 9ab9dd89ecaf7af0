// src/config/validate.rs

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    BackupPolicy, MonitorSettings, RawServerConfig, RestartPolicy, ServerConfig, SiteConfig,
};
use crate::errors::{ObsidiaError, Result};
use crate::schedule::ScheduleRule;

impl TryFrom<RawServerConfig> for ServerConfig {
    type Error = crate::errors::ObsidiaError;

    fn try_from(raw: RawServerConfig) -> std::result::Result<Self, Self::Error> {
        validate_server_section(&raw)?;
        validate_monitor_section(&raw)?;

        let restarts = RestartPolicy {
            schedule: enabled_schedule(
                "restarts",
                raw.restarts.autorestart,
                &raw.restarts.schedule,
            )?,
            restart_on_crash: raw.restarts.restart_on_crash,
            restart_delay: Duration::from_secs(raw.restarts.restart_delay_secs),
        };

        let backups = BackupPolicy {
            schedule: enabled_schedule("backups", raw.backups.enabled, &raw.backups.schedule)?,
            max_backups: validate_max_backups(raw.backups.max_backups)?,
            root: validate_backup_root(&raw.backups.root)?,
            exclude: raw.backups.exclude.clone(),
        };

        let monitor = MonitorSettings {
            poll_interval: Duration::from_secs(raw.monitor.poll_interval_secs),
            stop_timeout: Duration::from_secs(raw.monitor.stop_timeout_secs),
        };

        Ok(ServerConfig::new_unchecked(raw.server, restarts, backups, monitor))
    }
}

/// Basic sanity checks for the site file.
pub fn validate_site_config(cfg: &SiteConfig) -> Result<()> {
    if cfg.servers.directory.as_os_str().is_empty() {
        return Err(ObsidiaError::ConfigError(
            "[servers].directory must not be empty".to_string(),
        ));
    }
    if cfg.servers.shutdown_timeout_secs == 0 {
        return Err(ObsidiaError::ConfigError(
            "[servers].shutdown_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_server_section(cfg: &RawServerConfig) -> Result<()> {
    if cfg.server.jar.trim().is_empty() {
        return Err(ObsidiaError::ConfigError(
            "[server].jar must not be empty".to_string(),
        ));
    }
    if cfg.server.executable.trim().is_empty() {
        return Err(ObsidiaError::ConfigError(
            "[server].executable must not be empty".to_string(),
        ));
    }
    if cfg.server.shutdown_command.trim().is_empty() {
        return Err(ObsidiaError::ConfigError(
            "[server].shutdown_command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_monitor_section(cfg: &RawServerConfig) -> Result<()> {
    if cfg.monitor.poll_interval_secs == 0 {
        return Err(ObsidiaError::ConfigError(
            "[monitor].poll_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_max_backups(max: usize) -> Result<usize> {
    if max == 0 {
        return Err(ObsidiaError::ConfigError(
            "[backups].max_backups must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(max)
}

fn validate_backup_root(root: &str) -> Result<PathBuf> {
    let path = Path::new(root);
    let plain = !root.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if !plain {
        return Err(ObsidiaError::ConfigError(format!(
            "[backups].root must be a relative path inside the server directory (got '{root}')"
        )));
    }
    Ok(path.to_path_buf())
}

/// Parse a schedule string. The string is always validated, even when the
/// feature is off, so a typo is reported before someone turns it on.
fn enabled_schedule(section: &str, enabled: bool, schedule: &str) -> Result<Option<ScheduleRule>> {
    let rule: ScheduleRule = schedule.parse()?;

    if !enabled {
        return Ok(None);
    }
    if rule.is_empty() {
        warn!(
            section,
            schedule,
            "schedule has no weekdays; feature disabled"
        );
        return Ok(None);
    }
    Ok(Some(rule))
}
