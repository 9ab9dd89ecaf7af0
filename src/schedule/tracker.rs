// src/schedule/tracker.rs

//! Per-rule poll state used by the monitor loop.
//!
//! The monitor samples `offset_until` once per tick. The tracker compares each
//! sample with the previous one to detect that the scheduled moment has just
//! passed (the offset jumped up) and to fire countdown warnings once per
//! occurrence.

use chrono::NaiveDateTime;

use super::rule::ScheduleRule;

/// Countdown thresholds in seconds, largest first.
pub const WARNING_THRESHOLDS: [u64; 3] = [900, 300, 60];

/// What a single observation means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSignal {
    /// The offset dropped to or below this many seconds for the first time
    /// in the current occurrence.
    Warning(u64),
    /// The offset strictly increased since the previous sample: the
    /// scheduled moment was crossed between the two polls.
    Crossed,
}

#[derive(Debug, Clone)]
pub struct ScheduleTracker {
    rule: ScheduleRule,
    previous: Option<u64>,
    warned: [bool; WARNING_THRESHOLDS.len()],
}

impl ScheduleTracker {
    pub fn new(rule: ScheduleRule) -> Self {
        Self {
            rule,
            previous: None,
            warned: [false; WARNING_THRESHOLDS.len()],
        }
    }

    pub fn rule(&self) -> ScheduleRule {
        self.rule
    }

    /// Offset recorded by the last observation, if any.
    pub fn previous(&self) -> Option<u64> {
        self.previous
    }

    /// Forget all history (used when a new process is spawned).
    pub fn reset(&mut self) {
        self.previous = None;
        self.warned = [false; WARNING_THRESHOLDS.len()];
    }

    /// Sample the rule at `now`. Empty rules never signal.
    pub fn observe(&mut self, now: NaiveDateTime) -> Option<ScheduleSignal> {
        let offset = self.rule.offset_until(now)?;
        self.observe_offset(offset)
    }

    /// Feed a precomputed offset.
    ///
    /// When several thresholds are passed at once only the smallest one is
    /// reported; the larger ones are marked as already announced.
    pub fn observe_offset(&mut self, offset: u64) -> Option<ScheduleSignal> {
        let previous = self.previous.replace(offset);

        if let Some(previous) = previous
            && offset > previous
        {
            self.warned = [false; WARNING_THRESHOLDS.len()];
            return Some(ScheduleSignal::Crossed);
        }

        let mut signal = None;
        for (i, threshold) in WARNING_THRESHOLDS.iter().enumerate() {
            if offset <= *threshold && !self.warned[i] {
                self.warned[i] = true;
                signal = Some(ScheduleSignal::Warning(*threshold));
            }
        }
        signal
    }
}

/// Human-readable countdown for announcements ("15 minutes", "1 minute").
pub fn describe_countdown(secs: u64) -> String {
    let minutes = secs / 60;
    match minutes {
        0 => format!("{secs} seconds"),
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    }
}
