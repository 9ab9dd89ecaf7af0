// src/schedule/rule.rs

//! Weekly day/time rules and the time-until-next-occurrence computation.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};

use crate::errors::{ObsidiaError, Result};

/// Weekday letters in bit order (bit 0 = Sunday).
///
/// `R` is Thursday and `D` is Saturday so that every day has a distinct
/// letter.
pub const WEEKDAY_LETTERS: [char; 7] = ['S', 'M', 'T', 'W', 'R', 'F', 'D'];

/// How far ahead `offset_until` searches. Two weeks so that a slot that has
/// already passed today still finds next week's occurrence of the same day.
const SEARCH_DAYS: u64 = 14;

const ALL_DAYS: u8 = 0b111_1111;

/// A weekly schedule: a set of weekdays plus a time of day (24-hour).
///
/// Parsed from strings like `"MWF 0300"` or `"SMTWRFD 2330"`. A bare `"0300"`
/// is accepted and yields a rule with no weekdays, which never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleRule {
    days: u8,
    hour: u32,
    minute: u32,
}

impl ScheduleRule {
    /// Build a rule from a weekday bitmask (bit 0 = Sunday) and a time.
    pub fn new(days: u8, hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ObsidiaError::ScheduleError {
                input: format!("{hour:02}{minute:02}"),
                reason: "time of day out of range".to_string(),
            });
        }
        Ok(Self {
            days: days & ALL_DAYS,
            hour,
            minute,
        })
    }

    pub fn days(&self) -> u8 {
        self.days
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// A rule without weekdays has no next occurrence.
    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    pub fn includes(&self, weekday: Weekday) -> bool {
        self.days & (1 << weekday.num_days_from_sunday()) != 0
    }

    /// Whole seconds from `now` until the next moment matching this rule.
    ///
    /// A moment exactly at `now` counts as the next occurrence (offset 0).
    /// Returns `None` for an empty rule. For a non-empty rule the result is
    /// always below one week.
    pub fn offset_until(&self, now: NaiveDateTime) -> Option<u64> {
        if self.is_empty() {
            return None;
        }

        let slot = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let today = now.date();

        for day in 0..SEARCH_DAYS {
            let date = today.checked_add_days(Days::new(day))?;
            if !self.includes(date.weekday()) {
                continue;
            }

            let candidate = date.and_time(slot);
            if candidate >= now {
                return u64::try_from((candidate - now).num_seconds()).ok();
            }
        }

        None
    }
}

impl FromStr for ScheduleRule {
    type Err = ObsidiaError;

    fn from_str(s: &str) -> Result<Self> {
        let err = |reason: &str| ObsidiaError::ScheduleError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split_whitespace().collect();
        let (letters, time) = match parts.as_slice() {
            [time] => ("", *time),
            [letters, time] => (*letters, *time),
            _ => return Err(err("expected \"<days> <HHMM>\"")),
        };

        let mut days = 0u8;
        for c in letters.chars() {
            let upper = c.to_ascii_uppercase();
            match WEEKDAY_LETTERS.iter().position(|&l| l == upper) {
                Some(bit) => days |= 1 << bit,
                None => return Err(err(&format!("unknown weekday letter '{c}'"))),
            }
        }

        if time.len() != 4 || !time.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("time must be four digits (HHMM)"));
        }
        let hour: u32 = time[..2].parse().map_err(|_| err("invalid hour"))?;
        let minute: u32 = time[2..].parse().map_err(|_| err("invalid minute"))?;
        if hour > 23 {
            return Err(err("hour must be 00-23"));
        }
        if minute > 59 {
            return Err(err("minute must be 00-59"));
        }

        Ok(Self { days, hour, minute })
    }
}

impl fmt::Display for ScheduleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters: String = WEEKDAY_LETTERS
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.days & (1 << bit) != 0)
            .map(|(_, c)| *c)
            .collect();

        if letters.is_empty() {
            write!(f, "{:02}{:02}", self.hour, self.minute)
        } else {
            write!(f, "{} {:02}{:02}", letters, self.hour, self.minute)
        }
    }
}
