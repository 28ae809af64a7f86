//! Fixed-cadence series reconstruction.
//!
//! Upstream six-minute feeds skip samples and occasionally misbehave. The
//! normalizer walks the records against the nominal slot grid for one day,
//! emits `null` for every skipped slot and rejects anything that breaks the
//! grid. Rejections are upstream contract violations, never client errors.

mod formats;

pub use formats::{
    EXTREMA_FORMAT, PREDICTION_FORMAT, RAW_FORMAT, VERIFIED_FORMAT, normalize_extrema,
};

use crate::timefmt::{TimeFormatError, parse_timestamp};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde_json::{Value, json};
use thiserror::Error;

/// Minutes between nominal slots.
pub const CADENCE_MINUTES: i64 = 6;

/// Nominal slots in one day.
pub const SLOTS_PER_DAY: usize = (24 * 60 / CADENCE_MINUTES) as usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("No data provided for station {station_id}")]
    NoData { station_id: String },

    #[error("Expected first timestamp {expected} for station {station_id}, got {actual}")]
    MisalignedStart {
        station_id: String,
        expected: NaiveDateTime,
        actual: NaiveDateTime,
    },

    #[error("Timestamp {actual} for station {station_id} precedes expected {expected}")]
    OutOfOrder {
        station_id: String,
        expected: NaiveDateTime,
        actual: NaiveDateTime,
    },

    #[error("Timestamp {actual} for station {station_id} is past the end of the day at {end}")]
    PastEndOfDay {
        station_id: String,
        end: NaiveDateTime,
        actual: NaiveDateTime,
    },

    #[error("Invalid upstream timestamp: {0}")]
    Timestamp(#[from] TimeFormatError),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

/// An upstream record that occupies one slot of a packed series.
pub trait PackedRecord {
    /// Field names of [`PackedRecord::pack`], advertised as `packedDataFormat`.
    const FORMAT: &'static [&'static str];

    fn timestamp(&self) -> &str;

    fn pack(&self) -> Value;
}

/// Build the series payload for `date`:
/// `{"stationId","dateUTC","dataPoints","packedDataFormat","data"}`.
///
/// Records must be ascending and fall within `date`. `dataPoints` counts the
/// upstream records; gap markers are not counted. The series ends at the last
/// record; trailing slots are not padded.
pub fn normalize_series<R: PackedRecord>(
    station_id: &str,
    date: NaiveDate,
    records: &[R],
) -> Result<Value> {
    let data = fill_slots(station_id, date, records)?;

    Ok(json!({
        "stationId": station_id,
        "dateUTC": date.format("%Y-%m-%d").to_string(),
        "dataPoints": records.len(),
        "packedDataFormat": R::FORMAT,
        "data": data,
    }))
}

fn fill_slots<R: PackedRecord>(
    station_id: &str,
    date: NaiveDate,
    records: &[R],
) -> Result<Vec<Value>> {
    let first = records.first().ok_or_else(|| {
        tracing::error!(station_id, "Upstream returned no records");
        NormalizeError::NoData {
            station_id: station_id.to_string(),
        }
    })?;

    let step = TimeDelta::minutes(CADENCE_MINUTES);
    let day_start = date.and_time(NaiveTime::MIN);
    let first_ts = parse_timestamp(first.timestamp())?;

    if first_ts != day_start {
        tracing::error!(station_id, %first_ts, %date, "First record is not at start of day");
        return Err(NormalizeError::MisalignedStart {
            station_id: station_id.to_string(),
            expected: day_start,
            actual: first_ts,
        });
    }

    let day_end = day_start + TimeDelta::days(1);
    let mut cursor = day_start;
    let mut data = Vec::with_capacity(records.len().max(SLOTS_PER_DAY));

    for record in records {
        let ts = parse_timestamp(record.timestamp())?;

        if ts >= day_end {
            tracing::error!(station_id, %ts, %date, "Record falls after the requested day");
            return Err(NormalizeError::PastEndOfDay {
                station_id: station_id.to_string(),
                end: day_end,
                actual: ts,
            });
        }

        if ts > cursor {
            let mut skipped = 0usize;
            while ts > cursor {
                data.push(Value::Null);
                cursor += step;
                skipped += 1;
            }
            tracing::warn!(station_id, %ts, skipped, "Record overshot expected timestamp");
        }

        if ts != cursor {
            tracing::error!(station_id, expected = %cursor, %ts, "Record undershot expected timestamp");
            return Err(NormalizeError::OutOfOrder {
                station_id: station_id.to_string(),
                expected: cursor,
                actual: ts,
            });
        }

        data.push(record.pack());
        cursor += step;
    }

    Ok(data)
}
