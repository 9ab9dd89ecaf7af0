// src/schedule/mod.rs

//! Weekly schedules for restarts and backups.
//!
//! - [`rule`] parses `"<days> <HHMM>"` strings and computes the number of
//!   seconds until the next matching moment. Pure and deterministic given
//!   `now`.
//! - [`tracker`] keeps the per-rule state the monitor loop needs between
//!   polls (crossing detection and one-shot countdown warnings).

pub mod rule;
pub mod tracker;

pub use rule::{ScheduleRule, WEEKDAY_LETTERS};
pub use tracker::{describe_countdown, ScheduleSignal, ScheduleTracker, WARNING_THRESHOLDS};
