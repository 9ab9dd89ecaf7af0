// tests/schedule_rule.rs

mod common;
use crate::common::{datetime, TestResult};

use chrono::{Datelike, Duration, Weekday};

use obsidia::errors::ObsidiaError;
use obsidia::schedule::ScheduleRule;

#[test]
fn parses_letters_and_time() -> TestResult {
    let rule: ScheduleRule = "MWF 0300".parse()?;
    assert_eq!(rule.hour(), 3);
    assert_eq!(rule.minute(), 0);
    assert!(rule.includes(Weekday::Mon));
    assert!(rule.includes(Weekday::Wed));
    assert!(rule.includes(Weekday::Fri));
    assert!(!rule.includes(Weekday::Tue));
    assert!(!rule.includes(Weekday::Sun));
    Ok(())
}

#[test]
fn r_is_thursday_and_d_is_saturday() -> TestResult {
    let rule: ScheduleRule = "RD 1230".parse()?;
    assert!(rule.includes(Weekday::Thu));
    assert!(rule.includes(Weekday::Sat));
    assert!(!rule.includes(Weekday::Tue));
    Ok(())
}

#[test]
fn letters_are_case_insensitive_and_display_is_canonical() -> TestResult {
    let rule: ScheduleRule = "fwm 2359".parse()?;
    assert_eq!(rule.to_string(), "MWF 2359");

    let every_day: ScheduleRule = "smtwrfd 0400".parse()?;
    assert_eq!(every_day.to_string(), "SMTWRFD 0400");
    Ok(())
}

#[test]
fn bare_time_is_an_empty_rule() -> TestResult {
    let rule: ScheduleRule = "0400".parse()?;
    assert!(rule.is_empty());
    assert_eq!(rule.offset_until(datetime(2024, 1, 2, 2, 0, 0)), None);
    Ok(())
}

#[test]
fn rejects_malformed_schedules() {
    for input in ["", "MWF", "MWF 300", "MWF 03:00", "MXF 0300", "MWF 2400", "MWF 0360", "M W 0300"] {
        match input.parse::<ScheduleRule>() {
            Err(ObsidiaError::ScheduleError { input: reported, .. }) => {
                assert_eq!(reported, input)
            }
            other => panic!("expected ScheduleError for {input:?}, got {other:?}"),
        }
    }
}

#[test]
fn mwf_from_tuesday_morning_is_wednesday_three_am() -> TestResult {
    let rule: ScheduleRule = "MWF 0300".parse()?;
    // 2024-01-02 is a Tuesday.
    let now = datetime(2024, 1, 2, 2, 0, 0);
    assert_eq!(now.weekday(), Weekday::Tue);

    let offset = rule.offset_until(now).expect("non-empty rule");
    let next = now + Duration::seconds(offset as i64);
    assert_eq!(next, datetime(2024, 1, 3, 3, 0, 0));
    assert_eq!(offset, 25 * 3600);
    Ok(())
}

#[test]
fn just_after_the_slot_skips_to_the_next_matching_day() -> TestResult {
    let rule: ScheduleRule = "MWF 0300".parse()?;
    let now = datetime(2024, 1, 3, 3, 1, 0);

    let offset = rule.offset_until(now).expect("non-empty rule");
    let next = now + Duration::seconds(offset as i64);
    assert_eq!(next, datetime(2024, 1, 5, 3, 0, 0));
    assert_eq!(next.weekday(), Weekday::Fri);
    Ok(())
}

#[test]
fn exactly_at_the_slot_is_zero() -> TestResult {
    let rule: ScheduleRule = "W 0300".parse()?;
    assert_eq!(rule.offset_until(datetime(2024, 1, 3, 3, 0, 0)), Some(0));
    Ok(())
}

#[test]
fn single_day_rule_wraps_to_next_week_once_passed() -> TestResult {
    let rule: ScheduleRule = "W 0300".parse()?;
    let offset = rule
        .offset_until(datetime(2024, 1, 3, 3, 0, 1))
        .expect("non-empty rule");
    assert_eq!(offset, 7 * 86_400 - 1);
    Ok(())
}

#[test]
fn new_validates_ranges() {
    assert!(ScheduleRule::new(0b0000_0010, 23, 59).is_ok());
    assert!(ScheduleRule::new(0b0000_0010, 24, 0).is_err());
    assert!(ScheduleRule::new(0b0000_0010, 0, 60).is_err());
}
