#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use obsidia::clock::Clock;
use obsidia::config::{ServerConfig, ServerProperties};
use obsidia::fs::RealFileSystem;
use obsidia::supervisor::Supervisor;
use tempfile::TempDir;

use crate::builders::ServerConfigBuilder;

/// Shell stand-in for a game server.
///
/// - prints a readiness line on start;
/// - echoes every console command back as `> <command>`;
/// - `stop` exits 0, `crash` exits 3;
/// - exits 0 when stdin closes.
pub const FAKE_SERVER_SCRIPT: &str = r#"
echo "Starting fake server"
echo "[Server thread/INFO]: Done (0.42s)! For help, type \"help\""
while IFS= read -r line; do
  case "$line" in
    stop) echo "Stopping the server"; exit 0 ;;
    crash) echo "Exception in server tick loop"; exit 3 ;;
    *) echo "> $line" ;;
  esac
done
"#;

/// Like [`FAKE_SERVER_SCRIPT`] but ignores `stop`, for timeout paths.
pub const STUBBORN_SERVER_SCRIPT: &str = r#"
echo "[Server thread/INFO]: Done (0.10s)!"
while IFS= read -r line; do
  echo "> $line"
done
sleep 60
"#;

/// A throwaway server directory with a jar, a world and a config.
pub struct FakeServer {
    dir: TempDir,
    config: ServerConfig,
}

impl FakeServer {
    /// Server running [`FAKE_SERVER_SCRIPT`] with the builder's defaults.
    pub fn new() -> Self {
        Self::with_config(ServerConfigBuilder::new().shell_script(FAKE_SERVER_SCRIPT))
    }

    pub fn with_config(builder: ServerConfigBuilder) -> Self {
        let dir = tempfile::tempdir().expect("create temp server dir");
        let root = dir.path();

        fs::write(root.join("server.jar"), b"").unwrap();
        fs::write(
            root.join("server.properties"),
            "level-name=world\nmotd=A fake server\n",
        )
        .unwrap();

        let world = root.join("world");
        fs::create_dir_all(world.join("region")).unwrap();
        fs::write(world.join("level.dat"), b"level-v1").unwrap();
        fs::write(world.join("region").join("r.0.0.mca"), b"chunks-v1").unwrap();
        fs::write(world.join("session.lock"), b"lock").unwrap();

        Self {
            dir,
            config: builder.build(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn world(&self) -> PathBuf {
        self.dir.path().join("world")
    }

    pub fn backups(&self) -> PathBuf {
        self.dir.path().join(&self.config.backups.root)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Supervisor over the real filesystem.
    pub fn supervisor(&self, clock: Arc<dyn Clock>) -> Supervisor {
        let properties =
            ServerProperties::load(self.path()).expect("read fake server.properties");
        Supervisor::new(
            self.path(),
            self.config.clone(),
            properties,
            Arc::new(RealFileSystem),
            clock,
        )
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}
