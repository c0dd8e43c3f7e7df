//! Daily pause window.
//!
//! A schedule is a pair of UTC times of day. While the current time
//! falls inside the window the monitor does not probe; windows may wrap
//! past midnight. A window with equal endpoints means "no schedule".

use chrono::format::{Parsed, StrftimeItems, parse};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PauseSchedule {
    /// Build from offset-carrying time-of-day strings such as
    /// `"22:00:00+02:00"`. Returns `None` when start and end coincide.
    pub fn from_offset_strings(start: &str, end: &str) -> Result<Option<Self>> {
        let start = parse_utc_time_of_day(start)?;
        let end = parse_utc_time_of_day(end)?;
        if start == end {
            return Ok(None);
        }
        Ok(Some(Self { start, end }))
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let time = now.time();
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            // Wraps past midnight.
            time >= self.start || time < self.end
        }
    }
}

/// Parse a `HH:MM:SS±HH:MM` string and normalize it to a UTC time of
/// day.
pub fn parse_utc_time_of_day(raw: &str) -> Result<NaiveTime> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, raw, StrftimeItems::new("%H:%M:%S%:z"))
        .map_err(|e| Error::validation(format!("invalid schedule time '{raw}': {e}")))?;

    let local = parsed
        .to_naive_time()
        .map_err(|e| Error::validation(format!("invalid schedule time '{raw}': {e}")))?;
    let offset_secs = parsed
        .offset()
        .ok_or_else(|| Error::validation(format!("missing offset in schedule time '{raw}'")))?;

    let local_secs = i64::from(local.num_seconds_from_midnight());
    let utc_secs = (local_secs - i64::from(offset_secs)).rem_euclid(86_400);
    NaiveTime::from_num_seconds_from_midnight_opt(utc_secs as u32, 0)
        .ok_or_else(|| Error::validation(format!("invalid schedule time '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn plain_window_contains_interior_only() {
        let schedule = PauseSchedule::from_offset_strings("02:00:00+00:00", "06:00:00+00:00")
            .unwrap()
            .unwrap();

        assert!(!schedule.contains(utc(1, 59)));
        assert!(schedule.contains(utc(2, 0)));
        assert!(schedule.contains(utc(5, 59)));
        assert!(!schedule.contains(utc(6, 0)));
    }

    #[test]
    fn wrapping_window_spans_midnight() {
        let schedule = PauseSchedule::from_offset_strings("22:00:00+00:00", "06:00:00+00:00")
            .unwrap()
            .unwrap();

        assert!(schedule.contains(utc(23, 30)));
        assert!(schedule.contains(utc(3, 0)));
        assert!(!schedule.contains(utc(12, 0)));
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        // 22:00 at +02:00 is 20:00 UTC.
        assert_eq!(
            parse_utc_time_of_day("22:00:00+02:00").unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap()
        );
        // 01:00 at +03:00 wraps back to 22:00 UTC the previous day.
        assert_eq!(
            parse_utc_time_of_day("01:00:00+03:00").unwrap(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap()
        );
        assert_eq!(
            parse_utc_time_of_day("20:30:00-05:00").unwrap(),
            NaiveTime::from_hms_opt(1, 30, 0).unwrap()
        );
    }

    #[test]
    fn equal_endpoints_clear_the_schedule() {
        let schedule =
            PauseSchedule::from_offset_strings("08:00:00+00:00", "08:00:00+00:00").unwrap();
        assert!(schedule.is_none());
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert!(parse_utc_time_of_day("8am").is_err());
        assert!(parse_utc_time_of_day("25:00:00+00:00").is_err());
        assert!(parse_utc_time_of_day("08:00:00").is_err());
    }
}
