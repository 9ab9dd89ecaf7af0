// src/process/reader.rs

//! Background readers attached to a child's output pipes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::logs::LogMultiplexer;

use super::handle::LiveState;

/// Spawn the stdout reader for one process instance.
///
/// For every line, in order:
/// 1. flip the readiness flag if the line contains `marker`;
/// 2. publish the line to the multiplexer.
///
/// When the stream ends the instance is marked neither active nor ready.
/// Invalid UTF-8 is replaced rather than ending the stream.
pub(crate) fn spawn_stdout_reader<R>(
    stdout: R,
    live: Arc<LiveState>,
    generation: u64,
    logs: Arc<LogMultiplexer>,
    marker: String,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();

                    if !live.is_ready() && line.contains(&marker) && live.mark_ready(generation) {
                        info!(server = %logs.server(), "server reported ready");
                    }

                    logs.publish(line).await;
                }
                Err(e) => {
                    warn!(server = %logs.server(), error = %e, "error reading server stdout");
                    break;
                }
            }
        }

        live.mark_exited(generation);
        debug!(server = %logs.server(), generation, "stdout closed; reader finished");
    })
}

/// Always consume stderr so the pipe never fills; lines are logged at debug.
pub(crate) fn spawn_stderr_drain(stderr: ChildStderr, server: Arc<str>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(server = %server, "stderr: {}", line);
        }
    })
}
