// src/process/launch.rs

use std::path::{Path, PathBuf};

use crate::config::ServerSection;

/// Everything needed to build the child's command line.
///
/// The child is always invoked as
/// `<executable> <args...> -jar <jar> <headless_flag>` with the server
/// directory as its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub directory: PathBuf,
    pub executable: String,
    pub args: Vec<String>,
    pub jar: String,
    /// Omitted from the command line when empty.
    pub headless_flag: String,
}

impl LaunchSpec {
    pub fn from_config(directory: impl AsRef<Path>, server: &ServerSection) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            executable: server.executable.clone(),
            args: server.args.clone(),
            jar: server.jar.clone(),
            headless_flag: server.headless_flag.clone(),
        }
    }

    /// Arguments passed to the executable.
    pub fn argv(&self) -> Vec<String> {
        let mut argv: Vec<String> = self
            .args
            .iter()
            .filter(|a| !a.is_empty())
            .cloned()
            .collect();
        argv.push("-jar".to_string());
        argv.push(self.jar.clone());
        if !self.headless_flag.is_empty() {
            argv.push(self.headless_flag.clone());
        }
        argv
    }

    /// Shell-like rendering for logs and `--dry-run`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.clone())
            .chain(self.argv())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
