// src/logs/mod.rs

//! Console log fan-out.
//!
//! - [`event`] defines the line type delivered to listeners.
//! - [`listener`] defines the [`LogListener`] capability and ready-made
//!   listeners ([`QueueListener`], [`TracingListener`]).
//! - [`multiplexer`] owns the set of listeners for one server and delivers
//!   each line to all of them.

pub mod event;
pub mod listener;
pub mod multiplexer;

pub use event::{LogEvent, LogOrigin};
pub use listener::{LogListener, QueueListener, TracingListener, DEFAULT_QUEUE_CAPACITY};
pub use multiplexer::{LogMultiplexer, SubscriptionId};
