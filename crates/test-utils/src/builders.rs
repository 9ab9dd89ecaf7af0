#![allow(dead_code)]

use obsidia::config::{RawServerConfig, ServerConfig};

/// Builder for `ServerConfig` to simplify test setup.
///
/// Starts from the same defaults an empty `obsidia.toml` gets, with a short
/// poll interval and no restart delay so tests run quickly.
pub struct ServerConfigBuilder {
    config: RawServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawServerConfig::default();
        config.monitor.poll_interval_secs = 1;
        config.monitor.stop_timeout_secs = 5;
        config.restarts.restart_delay_secs = 0;
        Self { config }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.server.name = name.to_string();
        self
    }

    /// Run `script` with `sh -c`; `-jar <jar> <flag>` become `$0..$2`.
    pub fn shell_script(mut self, script: &str) -> Self {
        self.config.server.executable = "sh".to_string();
        self.config.server.args = vec!["-c".to_string(), script.to_string()];
        self
    }

    pub fn readiness_marker(mut self, marker: &str) -> Self {
        self.config.server.readiness_marker = marker.to_string();
        self
    }

    pub fn restart_on_crash(mut self, enabled: bool) -> Self {
        self.config.restarts.restart_on_crash = enabled;
        self
    }

    pub fn restart_delay_secs(mut self, secs: u64) -> Self {
        self.config.restarts.restart_delay_secs = secs;
        self
    }

    pub fn restart_schedule(mut self, schedule: &str) -> Self {
        self.config.restarts.autorestart = true;
        self.config.restarts.schedule = schedule.to_string();
        self
    }

    pub fn backup_schedule(mut self, schedule: &str) -> Self {
        self.config.backups.enabled = true;
        self.config.backups.schedule = schedule.to_string();
        self
    }

    pub fn max_backups(mut self, max: usize) -> Self {
        self.config.backups.max_backups = max;
        self
    }

    pub fn exclude(mut self, names: &[&str]) -> Self {
        self.config.backups.exclude = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn stop_timeout_secs(mut self, secs: u64) -> Self {
        self.config.monitor.stop_timeout_secs = secs;
        self
    }

    pub fn raw(&self) -> &RawServerConfig {
        &self.config
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
