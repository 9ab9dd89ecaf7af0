// src/logs/listener.rs

//! The listener capability plus two ready-made listeners.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::info;

use super::event::{LogEvent, LogOrigin};

/// Default per-listener queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Anything that wants to receive console lines.
///
/// `receive` is called from the listener's own delivery task, one event at a
/// time, in arrival order. It must not block: a listener that stalls fills
/// its queue, and once the queue is full the process's stdout reader waits
/// on it (which in turn holds up every other listener).
pub trait LogListener: Send + Sync + 'static {
    fn receive(&self, event: &LogEvent);

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue depth; clamped to at least 1.
    fn queue_capacity(&self) -> usize {
        DEFAULT_QUEUE_CAPACITY
    }
}

impl<F> LogListener for F
where
    F: Fn(&LogEvent) + Send + Sync + 'static,
{
    fn receive(&self, event: &LogEvent) {
        self(event)
    }
}

/// Buffers every line it receives so a consumer can poll for them.
#[derive(Debug, Default)]
pub struct QueueListener {
    queue: Mutex<VecDeque<LogEvent>>,
}

impl QueueListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest buffered event.
    pub fn next(&self) -> Option<LogEvent> {
        self.lock().pop_front()
    }

    pub fn has_next(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Take everything buffered so far.
    pub fn drain(&self) -> Vec<LogEvent> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEvent>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogListener for QueueListener {
    fn receive(&self, event: &LogEvent) {
        self.lock().push_back(event.clone());
    }

    fn name(&self) -> &str {
        "queue"
    }
}

/// Re-emits console lines as `tracing` events under `obsidia::console`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl LogListener for TracingListener {
    fn receive(&self, event: &LogEvent) {
        match event.origin {
            LogOrigin::Console => {
                info!(target: "obsidia::console", server = %event.server, "{}", event.line)
            }
            LogOrigin::Supervisor => {
                info!(target: "obsidia::notice", server = %event.server, "{}", event.line)
            }
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
