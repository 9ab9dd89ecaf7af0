// src/logs/event.rs

use std::fmt;
use std::sync::Arc;

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOrigin {
    /// A line the managed process wrote to its stdout.
    Console,
    /// A notice emitted by obsidia itself (backup phases, crash notices,
    /// write failures, subscription confirmations).
    Supervisor,
}

/// One line delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Name of the server the line belongs to.
    pub server: Arc<str>,
    pub line: String,
    /// Arrival order within one multiplexer.
    pub seq: u64,
    pub origin: LogOrigin,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.server, self.line)
    }
}
