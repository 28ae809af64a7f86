//! Timestamp parsing and formatting for the CO-OPS services.
//!
//! The services document `yyyyMMdd HH:mm`, but water level reports return
//! `yyyy-mm-dd HH:MM:SS.s` and prediction reports return `mm/dd/yyyy HH:MM`.
//! [`parse_timestamp`] accepts all of them; every timestamp is UTC because
//! every request asks for GMT.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

pub const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const SEVEN_DAYS: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Sub-second digits kept when parsing fractional seconds (nanoseconds).
const FRACTION_DIGITS: usize = 9;

const TIME_PATTERN: &str = r"(?<hour>[01][0-9]|2[0-3]):(?<minute>[0-5][0-9])(?::(?<second>[0-5][0-9])(?:\.(?<frac>[0-9]+))?)?$";

// Tried in this order.
static WATER_LEVEL_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?<year>[0-9]{{4}})-?(?<month>0[1-9]|1[0-2])-?(?<day>0[1-9]|[12][0-9]|3[01]) {TIME_PATTERN}"
    ))
    .expect("water level timestamp pattern is valid")
});

static PREDICTION_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?<month>0[1-9]|1[0-2])/(?<day>0[1-9]|[12][0-9]|3[01])/(?<year>[0-9]{{4}}) {TIME_PATTERN}"
    ))
    .expect("prediction timestamp pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeFormatError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, TimeFormatError>;

/// Parse an upstream timestamp string.
///
/// # Errors
///
/// `InvalidFormat` when no known format matches, or when the fields match a
/// format but do not name a real calendar instant (e.g. `2021-02-30 00:00`).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let captures = WATER_LEVEL_FORMAT
        .captures(raw)
        .or_else(|| PREDICTION_FORMAT.captures(raw))
        .ok_or_else(|| TimeFormatError::InvalidFormat(format!("unrecognized timestamp: {raw}")))?;

    let field = |name: &str| -> u32 {
        captures
            .name(name)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let year = captures
        .name("year")
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(|| TimeFormatError::InvalidFormat(format!("missing year: {raw}")))?;

    let date = NaiveDate::from_ymd_opt(year, field("month"), field("day"))
        .ok_or_else(|| TimeFormatError::InvalidFormat(format!("not a calendar date: {raw}")))?;
    let time = NaiveTime::from_hms_nano_opt(
        field("hour"),
        field("minute"),
        field("second"),
        fraction_to_nanos(&captures),
    )
    .ok_or_else(|| TimeFormatError::InvalidFormat(format!("not a time of day: {raw}")))?;

    Ok(date.and_time(time))
}

fn fraction_to_nanos(captures: &Captures<'_>) -> u32 {
    let Some(frac) = captures.name("frac") else {
        return 0;
    };

    let mut digits: String = frac.as_str().chars().take(FRACTION_DIGITS).collect();
    while digits.len() < FRACTION_DIGITS {
        digits.push('0');
    }

    digits.parse().unwrap_or(0)
}

/// Render a timestamp in the upstream request format (`yyyyMMdd HH:mm`), in UTC.
pub fn format_upstream_timestamp<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String {
    timestamp
        .with_timezone(&Utc)
        .format("%Y%m%d %H:%M")
        .to_string()
}

/// Parse a strict `YYYYMMDD` calendar date.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate> {
    if raw.len() != 8 {
        return Err(TimeFormatError::InvalidFormat(format!(
            "date must be exactly 8 digits (YYYYMMDD): {raw}"
        )));
    }

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeFormatError::InvalidFormat(format!(
            "date cannot contain non-digits: {raw}"
        )));
    }

    let year: i32 = raw[0..4].parse().unwrap_or_default();
    let month: u32 = raw[4..6].parse().unwrap_or_default();
    let day: u32 = raw[6..8].parse().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        TimeFormatError::InvalidFormat(format!("date must be a valid calendar date: {raw}"))
    })
}

/// Inverse of [`parse_calendar_date`].
pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// RFC 7231 IMF-fixdate, as used by `Expires` and `Retry-After`.
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// ISO-8601 local timestamp with seconds only when they are non-zero.
pub fn iso_timestamp(timestamp: NaiveDateTime) -> String {
    if timestamp.nanosecond() != 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    } else if timestamp.second() != 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_water_level_formats() {
        assert_eq!(
            parse_timestamp("2020-01-01 00:06").unwrap(),
            ymd_hms(2020, 1, 1, 0, 6, 0)
        );
        assert_eq!(
            parse_timestamp("20200101 13:42").unwrap(),
            ymd_hms(2020, 1, 1, 13, 42, 0)
        );
        assert_eq!(
            parse_timestamp("2020-01-01 13:42:07").unwrap(),
            ymd_hms(2020, 1, 1, 13, 42, 7)
        );
    }

    #[test]
    fn test_parse_prediction_format() {
        assert_eq!(
            parse_timestamp("12/31/2019 23:54").unwrap(),
            ymd_hms(2019, 12, 31, 23, 54, 0)
        );
        assert_eq!(
            parse_timestamp("02/29/2020 12:00:30").unwrap(),
            ymd_hms(2020, 2, 29, 12, 0, 30)
        );
    }

    #[test]
    fn test_parse_fractional_seconds_are_padded_and_truncated() {
        let short = parse_timestamp("2020-01-01 00:00:00.5").unwrap();
        assert_eq!(short.nanosecond(), 500_000_000);

        let long = parse_timestamp("2020-01-01 00:00:00.1234567891").unwrap();
        assert_eq!(long.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_parse_rejects_unknown_formats() {
        for raw in [
            "",
            "2020-01-01",
            "2020-01-01T00:00",
            "2020/01/01 00:00",
            "01-01-2020 00:00",
            "2020-13-01 00:00",
            "2020-01-01 24:00",
            "2020-01-01 00:60",
            " 2020-01-01 00:00",
        ] {
            assert!(
                matches!(parse_timestamp(raw), Err(TimeFormatError::InvalidFormat(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_impossible_dates() {
        assert!(parse_timestamp("2021-02-29 00:00").is_err());
        assert!(parse_timestamp("04/31/2020 00:00").is_err());
    }

    #[test]
    fn test_format_upstream_converts_to_utc() {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2020, 1, 1, 20, 30, 0).unwrap();
        assert_eq!(format_upstream_timestamp(&local), "20200102 04:30");

        let utc = Utc.with_ymd_and_hms(2019, 7, 4, 0, 6, 59).unwrap();
        assert_eq!(format_upstream_timestamp(&utc), "20190704 00:06");
    }

    #[test]
    fn test_calendar_date_round_trips() {
        for raw in ["19900101", "20000229", "20200101", "20241231", "99991231"] {
            let date = parse_calendar_date(raw).unwrap();
            assert_eq!(format_calendar_date(date), raw);
        }
    }

    #[test]
    fn test_calendar_date_rejects_malformed() {
        for raw in [
            "", "2020010", "202001011", "2020-101", "2020O101", "２０２００１０１",
            "20201301", "20200001", "20200230", "20210229", "20200100",
        ] {
            assert!(
                matches!(parse_calendar_date(raw), Err(TimeFormatError::InvalidFormat(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_http_date() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(http_date(ts), "Wed, 01 Jan 2020 00:00:00 GMT");
    }

    #[test]
    fn test_iso_timestamp_omits_zero_seconds() {
        assert_eq!(iso_timestamp(ymd_hms(2020, 1, 1, 5, 30, 0)), "2020-01-01T05:30");
        assert_eq!(iso_timestamp(ymd_hms(2020, 1, 1, 5, 30, 12)), "2020-01-01T05:30:12");
    }
}
