// src/config/mod.rs

//! Configuration loading and validation for obsidia.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load the site file and per-server files from disk, writing defaults
//!   back for missing options (`loader.rs`).
//! - Validate schedules, retention and intervals (`validate.rs`).
//! - Read the few values obsidia needs from `server.properties`
//!   (`properties.rs`).

pub mod loader;
pub mod model;
pub mod properties;
pub mod validate;

pub use loader::{
    load_raw_server_config, load_server_config, load_site_config, SERVER_CONFIG_FILE,
};
pub use model::{
    BackupPolicy, BackupSection, MonitorSection, MonitorSettings, RawServerConfig,
    RestartPolicy, RestartSection, ServerConfig, ServerSection, ServersSection, SiteConfig,
};
pub use properties::ServerProperties;
pub use validate::validate_site_config;
