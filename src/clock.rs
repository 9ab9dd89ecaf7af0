// src/clock.rs

//! Wall-clock abstraction.
//!
//! Schedules are evaluated against local wall time and backups are named by
//! Unix timestamp. Both go through a [`Clock`] so tests can pin the time.

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

pub trait Clock: Send + Sync + Debug {
    /// Current local wall time (no timezone attached).
    fn now(&self) -> NaiveDateTime;

    /// Seconds since the Unix epoch.
    fn unix_timestamp(&self) -> i64;
}

/// The real clock, backed by `chrono::Local`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn unix_timestamp(&self) -> i64 {
        Local::now().timestamp()
    }
}

/// A clock that only moves when told to.
///
/// The stored wall time is interpreted as UTC when a Unix timestamp is
/// requested.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.lock();
        *guard += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        // A poisoned clock still holds a valid timestamp.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock()
    }

    fn unix_timestamp(&self) -> i64 {
        self.lock().and_utc().timestamp()
    }
}
