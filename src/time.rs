//! ISO-8601 date handling for the search time window.
//!
//! The start/end inputs of a search hold ISO-8601 text. Text without an offset is read as UTC;
//! text with an offset is converted to UTC. When a query is submitted the window is sent as Unix
//! epoch seconds under the `start` and `end` meta parameters.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Field names that act as a relative time-window shortcut when used with the `any` class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Timestamp,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "timestamp" => Some(TimeUnit::Timestamp),
            "minute" => Some(TimeUnit::Minute),
            "hour" => Some(TimeUnit::Hour),
            "day" => Some(TimeUnit::Day),
            _ => None,
        }
    }

    /// Width of the window this unit selects.
    pub fn seconds(self) -> i64 {
        match self {
            TimeUnit::Timestamp => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3600,
            TimeUnit::Day => 86400,
        }
    }

    /// The window `[start, end]` starting at `start`. Fails if `end` is past the last
    /// representable date.
    pub fn window(self, start: NaiveDateTime) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let end = start
            .checked_add_signed(Duration::seconds(self.seconds()))
            .ok_or_else(|| Error::BadTimestamp(format_iso(&start)))?;
        Ok((start, end))
    }
}

/// Parse ISO-8601 text. Accepts a full date & time with or without fractional seconds, a space in
/// place of the `T`, minute precision, a bare date (midnight), or RFC 3339 with an offset.
pub fn parse_iso(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim().trim_matches('"');
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    for fmt in NAIVE_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::BadTimestamp(text.to_string()))
}

pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn epoch_seconds(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_iso("2024-01-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_iso("2024-01-01 00:00:00").unwrap(), expected);
        assert_eq!(parse_iso("2024-01-01").unwrap(), expected);
        assert_eq!(parse_iso("\"2024-01-01T00:00\"").unwrap(), expected);
        assert_eq!(parse_iso("2024-01-01T02:00:00+02:00").unwrap(), expected);
        assert!(matches!(parse_iso("yesterday"), Err(Error::BadTimestamp(_))));
    }

    #[test]
    fn unit_windows() {
        let start = parse_iso("2024-01-01T00:00:00").unwrap();
        let (_, end) = TimeUnit::Hour.window(start).unwrap();
        assert_eq!(format_iso(&end), "2024-01-01T01:00:00");
        let (_, end) = TimeUnit::Day.window(start).unwrap();
        assert_eq!(format_iso(&end), "2024-01-02T00:00:00");
        let (_, end) = TimeUnit::Timestamp.window(start).unwrap();
        assert_eq!(format_iso(&end), "2024-01-01T00:00:01");
        assert_eq!(TimeUnit::from_field("week"), None);
    }

    #[test]
    fn window_past_max_date() {
        let last = parse_iso("+262142-12-31T23:59:59").unwrap();
        assert!(matches!(TimeUnit::Day.window(last), Err(Error::BadTimestamp(_))));
        assert!(matches!(TimeUnit::Timestamp.window(last), Err(Error::BadTimestamp(_))));
        let (start, end) = TimeUnit::Minute.window(NaiveDateTime::MIN).unwrap();
        assert_eq!(end - start, Duration::seconds(60));
    }

    #[test]
    fn epoch() {
        let start = parse_iso("1970-01-02T00:00:00").unwrap();
        assert_eq!(epoch_seconds(&start), 86400);
    }
}
