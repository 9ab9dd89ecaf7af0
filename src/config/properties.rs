// src/config/properties.rs

//! Minimal reader for the managed server's own `server.properties`.
//!
//! obsidia only needs two values from it: the data directory name
//! (`level-name`) and the message of the day (`motd`).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::errors::Result;

pub const PROPERTIES_FILE: &str = "server.properties";

const DEFAULT_LEVEL_NAME: &str = "world";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    /// Name of the live data directory, relative to the server directory.
    pub level_name: String,
    pub motd: Option<String>,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            level_name: DEFAULT_LEVEL_NAME.to_string(),
            motd: None,
        }
    }
}

impl ServerProperties {
    /// Parse `key=value` lines. Blank lines and `#`/`!` comments are skipped;
    /// only the first `=` splits.
    pub fn parse(contents: &str) -> Self {
        let values: HashMap<&str, &str> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let level_name = values
            .get("level-name")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .unwrap_or_else(|| DEFAULT_LEVEL_NAME.to_string());

        let motd = values
            .get("motd")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());

        Self { level_name, motd }
    }

    /// Read `<server_dir>/server.properties`.
    ///
    /// A missing file is not an error: the server writes it on first start,
    /// so defaults are used until then.
    pub fn load(server_dir: &Path) -> Result<Self> {
        match fs::read_to_string(server_dir.join(PROPERTIES_FILE)) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
