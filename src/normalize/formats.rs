use super::{NormalizeError, PackedRecord, Result};
use crate::timefmt::{iso_timestamp, parse_timestamp};
use crate::upstream::{HighLowDay, PredictionRecord, RawRecord, VerifiedRecord};
use chrono::NaiveDate;
use serde_json::{Value, json};

pub const VERIFIED_FORMAT: &[&str] = &["waterLevelMeters", "sigma", "flags"];
pub const RAW_FORMAT: &[&str] = &["waterLevelMeters", "sigma", "samplesOutsideThreeSigma", "flags"];
pub const PREDICTION_FORMAT: &[&str] = &["waterLevelMeters"];
pub const EXTREMA_FORMAT: &[&str] = &["timestampUTC", "waterLevelMeters", "extremaType"];

/// Names of the indicators that are set, in declaration order.
fn flags(indicators: &[(i32, &'static str)]) -> Value {
    indicators
        .iter()
        .filter(|(code, _)| *code != 0)
        .map(|(_, name)| Value::from(*name))
        .collect()
}

impl PackedRecord for VerifiedRecord {
    const FORMAT: &'static [&'static str] = VERIFIED_FORMAT;

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn pack(&self) -> Value {
        json!([
            self.water_level,
            self.sigma,
            flags(&[
                (self.inferred, "inferred"),
                (self.flat_tolerance, "flatToleranceLimitExceeded"),
                (self.rate_of_change, "rateOfChangeToleranceLimitExceeded"),
                (self.temperature, "temperatureToleranceLimitExceeded"),
            ]),
        ])
    }
}

impl PackedRecord for RawRecord {
    const FORMAT: &'static [&'static str] = RAW_FORMAT;

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn pack(&self) -> Value {
        json!([
            self.water_level,
            self.sigma,
            self.outside_three_sigma,
            flags(&[
                (self.flat_tolerance, "flatToleranceLimitExceeded"),
                (self.rate_of_change, "rateOfChangeToleranceLimitExceeded"),
                (self.limit_exceeded, "waterLevelLimitExceeded"),
            ]),
        ])
    }
}

impl PackedRecord for PredictionRecord {
    const FORMAT: &'static [&'static str] = PREDICTION_FORMAT;

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn pack(&self) -> Value {
        json!([self.prediction])
    }
}

/// Build the extrema payload. Extrema are irregular, so there is no slot grid;
/// each entry carries its own timestamp. `dataPoints` counts upstream days.
pub fn normalize_extrema(station_id: &str, date: NaiveDate, days: &[HighLowDay]) -> Result<Value> {
    let mut data = Vec::new();

    for day in days {
        for extremum in &day.extrema {
            let ts = parse_timestamp(&format!("{} {}", day.date, extremum.time))
                .map_err(NormalizeError::from)?;
            data.push(json!([iso_timestamp(ts), extremum.prediction, extremum.kind]));
        }
    }

    Ok(json!({
        "stationId": station_id,
        "dataPoints": days.len(),
        "dateLocalTimeZone": date.format("%Y-%m-%d").to_string(),
        "packedDataFormat": EXTREMA_FORMAT,
        "data": data,
    }))
}
