// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{RawServerConfig, ServerConfig, SiteConfig};
use crate::config::validate::validate_site_config;
use crate::errors::Result;

/// Name of the per-server config file inside each server directory.
pub const SERVER_CONFIG_FILE: &str = "obsidia.toml";

/// Load and validate the site configuration.
///
/// Unlike the per-server files this one is not created on demand: a missing
/// file or a missing `[servers]` section is a startup error.
pub fn load_site_config(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: SiteConfig = toml::from_str(&contents)?;
    validate_site_config(&config)?;
    Ok(config)
}

/// Read `<server_dir>/obsidia.toml` without validation.
///
/// A missing file is treated as empty. Any option absent from the file is
/// filled from its default and the file is rewritten so operators can see
/// (and edit) every option. Keys obsidia does not know about are preserved.
pub fn load_raw_server_config(server_dir: impl AsRef<Path>) -> Result<RawServerConfig> {
    let path = server_config_path(server_dir.as_ref());

    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = ?path, "no server config found; creating one with defaults");
            String::new()
        }
        Err(e) => return Err(e.into()),
    };

    let raw: RawServerConfig = toml::from_str(&contents)?;
    persist_defaults(&path, &contents, &raw)?;

    Ok(raw)
}

/// Load a server's configuration and validate it.
pub fn load_server_config(server_dir: impl AsRef<Path>) -> Result<ServerConfig> {
    let raw = load_raw_server_config(server_dir)?;
    ServerConfig::try_from(raw)
}

pub fn server_config_path(server_dir: &Path) -> PathBuf {
    server_dir.join(SERVER_CONFIG_FILE)
}

/// Helper to resolve the default site config path.
pub fn default_site_config_path() -> PathBuf {
    PathBuf::from("obsidia.toml")
}

fn persist_defaults(path: &Path, contents: &str, raw: &RawServerConfig) -> Result<()> {
    let mut on_disk: toml::Table = toml::from_str(contents)?;
    let full = match toml::Value::try_from(raw)? {
        toml::Value::Table(t) => t,
        _ => return Ok(()),
    };

    if fill_missing(&mut on_disk, &full) {
        debug!(path = ?path, "writing defaults back to server config");
        fs::write(path, toml::to_string_pretty(&on_disk)?)?;
    }
    Ok(())
}

/// Copy every key of `defaults` that `target` lacks, recursing into tables.
/// Returns whether anything was added.
fn fill_missing(target: &mut toml::Table, defaults: &toml::Table) -> bool {
    let mut changed = false;
    for (key, value) in defaults {
        match (target.get_mut(key), value) {
            (None, _) => {
                target.insert(key.clone(), value.clone());
                changed = true;
            }
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                changed |= fill_missing(existing, nested);
            }
            (Some(_), _) => {}
        }
    }
    changed
}
