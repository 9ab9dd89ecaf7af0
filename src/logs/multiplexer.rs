// src/logs/multiplexer.rs

//! Fan-out of console lines to any number of listeners.
//!
//! ```text
//!   publish(line)
//!        │
//!        ├──► [bounded queue L1] ──► delivery task L1 ──► L1.receive()
//!        ├──► [bounded queue L2] ──► delivery task L2 ──► L2.receive()
//!        └──► [bounded queue LN] ──► delivery task LN ──► LN.receive()
//! ```
//!
//! Guarantees:
//! - every line published after `subscribe` returns reaches that listener;
//! - lines reach each listener in publish order.
//!
//! Not guaranteed:
//! - any ordering between two different listeners.
//!
//! Backpressure: `publish` waits while a listener's queue is full. A listener
//! that stops draining therefore ends up stalling the stdout reader that
//! feeds the multiplexer, and with it every other listener. Queues keep this
//! from happening on short bursts; listeners must still be non-blocking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::event::{LogEvent, LogOrigin};
use super::listener::LogListener;

/// Handle returned by [`LogMultiplexer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    name: String,
    sender: mpsc::Sender<Arc<LogEvent>>,
}

pub struct LogMultiplexer {
    server: Arc<str>,
    seq: AtomicU64,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl std::fmt::Debug for LogMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMultiplexer")
            .field("server", &self.server)
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl LogMultiplexer {
    pub fn new(server: impl Into<Arc<str>>) -> Self {
        Self {
            server: server.into(),
            seq: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Register a listener.
    ///
    /// The listener receives a `"Subscribed to logs for <server>."` line
    /// synchronously, before this returns. Must be called from within a Tokio
    /// runtime: a delivery task is spawned per listener.
    pub fn subscribe(&self, listener: Arc<dyn LogListener>) -> SubscriptionId {
        let confirmation = self.event(
            format!("Subscribed to logs for {}.", self.server),
            LogOrigin::Supervisor,
        );
        listener.receive(&confirmation);

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = listener.name().to_string();
        let (tx, mut rx) = mpsc::channel::<Arc<LogEvent>>(listener.queue_capacity().max(1));

        let server = Arc::clone(&self.server);
        let worker_name = name.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let delivered = catch_unwind(AssertUnwindSafe(|| listener.receive(&event)));
                if delivered.is_err() {
                    warn!(
                        server = %server,
                        listener = %worker_name,
                        seq = event.seq,
                        "log listener panicked; line dropped for this listener"
                    );
                }
            }
            debug!(server = %server, listener = %worker_name, "log delivery task finished");
        });

        debug!(server = %self.server, listener = %name, ?id, "log listener subscribed");
        self.lock().push(Subscriber {
            id,
            name,
            sender: tx,
        });
        id
    }

    /// Remove a listener. Lines already queued for it are still delivered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        before != subs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Publish a console line to every listener.
    pub async fn publish(&self, line: impl Into<String>) {
        self.dispatch(self.event(line.into(), LogOrigin::Console)).await;
    }

    /// Publish an obsidia notice through the same channel as console lines.
    pub async fn notify(&self, line: impl Into<String>) {
        self.dispatch(self.event(line.into(), LogOrigin::Supervisor)).await;
    }

    async fn dispatch(&self, event: LogEvent) {
        let event = Arc::new(event);

        // Snapshot senders so the lock is not held across `.await`.
        let targets: Vec<(SubscriptionId, String, mpsc::Sender<Arc<LogEvent>>)> = self
            .lock()
            .iter()
            .map(|s| (s.id, s.name.clone(), s.sender.clone()))
            .collect();

        let mut closed = Vec::new();
        for (id, name, sender) in targets {
            if sender.send(Arc::clone(&event)).await.is_err() {
                warn!(server = %self.server, listener = %name, "log listener gone; removing");
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            self.lock().retain(|s| !closed.contains(&s.id));
        }
    }

    fn event(&self, line: String, origin: LogOrigin) -> LogEvent {
        LogEvent {
            server: Arc::clone(&self.server),
            line,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            origin,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
