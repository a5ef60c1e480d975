use chrono::{NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATETIME_FORMAT: &str = "%y/%m/%d %H:%M:%S";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimeError {
    #[error("cannot parse '{input}' with format '{format}': {reason}")]
    Parse {
        input: String,
        format: String,
        reason: String,
    },
    #[error("start {start} must be before end {end}")]
    EmptyRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

pub fn parse_instant(input: &str, format: &str) -> Result<NaiveDateTime, TimeError> {
    NaiveDateTime::parse_from_str(input.trim(), format).map_err(|e| TimeError::Parse {
        input: input.to_string(),
        format: format.to_string(),
        reason: e.to_string(),
    })
}

/// Drops the seconds and sub-second part of `ts`.
pub fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts - TimeDelta::seconds(i64::from(ts.second())) - TimeDelta::nanoseconds(i64::from(ts.nanosecond()))
}

/// Closed-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, TimeError> {
        if start >= end {
            return Err(TimeError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str, format: &str) -> Result<Self, TimeError> {
        Self::new(parse_instant(start, format)?, parse_instant(end, format)?)
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    /// One-minute windows starting at `start`, stepping until a window
    /// start reaches `end`. The last window is not clipped to `end`.
    pub fn minute_windows(&self) -> MinuteWindows {
        MinuteWindows {
            next: self.start,
            end: self.end,
        }
    }
}

pub struct MinuteWindows {
    next: NaiveDateTime,
    end: NaiveDateTime,
}

impl Iterator for MinuteWindows {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        if self.next >= self.end {
            return None;
        }
        let start = self.next;
        let end = start + TimeDelta::minutes(1);
        self.next = end;
        Some(TimeRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").unwrap()
    }

    #[test]
    fn parses_default_format() {
        let t = parse_instant("21/06/12 18:26:00", DEFAULT_DATETIME_FORMAT).unwrap();
        assert_eq!(t, ts("2021-06-12T18:26:00"));
    }

    #[test]
    fn parse_error_names_input() {
        let err = parse_instant("yesterday", DEFAULT_DATETIME_FORMAT).unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn truncation_zeroes_seconds() {
        assert_eq!(truncate_to_minute(ts("2021-06-12T18:26:59.750")), ts("2021-06-12T18:26:00"));
        assert_eq!(truncate_to_minute(ts("2021-06-12T18:26:00")), ts("2021-06-12T18:26:00"));
    }

    #[test]
    fn empty_range_rejected() {
        let t = ts("2021-06-12T18:26:00");
        assert!(matches!(TimeRange::new(t, t), Err(TimeError::EmptyRange { .. })));
    }

    #[test]
    fn range_is_closed_open() {
        let r = TimeRange::new(ts("2021-06-12T18:26:00"), ts("2021-06-12T18:30:00")).unwrap();
        assert!(r.contains(ts("2021-06-12T18:26:00")));
        assert!(r.contains(ts("2021-06-12T18:29:59")));
        assert!(!r.contains(ts("2021-06-12T18:30:00")));
    }

    #[test]
    fn minute_windows_cover_range() {
        let r = TimeRange::new(ts("2021-06-12T18:26:00"), ts("2021-06-12T18:30:00")).unwrap();
        let windows: Vec<_> = r.minute_windows().collect();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].start, ts("2021-06-12T18:26:00"));
        assert_eq!(windows[3].end, ts("2021-06-12T18:30:00"));
    }

    #[test]
    fn partial_trailing_minute_gets_a_window() {
        let r = TimeRange::new(ts("2021-06-12T18:26:00"), ts("2021-06-12T18:27:30")).unwrap();
        let windows: Vec<_> = r.minute_windows().collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].end, ts("2021-06-12T18:28:00"));
    }
}
