use super::{PathParams, stations_to_json};
use crate::clock::Clock;
use crate::normalize::{NormalizeError, normalize_extrema, normalize_series};
use crate::timefmt::{
    self, ONE_DAY, SEVEN_DAYS, THIRTY_DAYS, TimeFormatError, parse_calendar_date, start_of_day,
};
use crate::upstream::{Upstream, UpstreamError, UpstreamParams};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Earliest date any dated report serves.
pub const MIN_SERVICE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1990, 1, 1) {
    Some(date) => date,
    None => panic!("minimum service date is valid"),
};

/// Predictions are requested at the series cadence.
const PREDICTION_INTERVAL_MINUTES: u32 = 6;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid date: {0}")]
    InvalidDate(#[from] TimeFormatError),

    #[error("Data is not available before {min}")]
    BeforeMinimum { min: NaiveDate },

    #[error("Data is not yet available")]
    NotYetAvailable { available_at: DateTime<Utc> },

    #[error("Missing path parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Upstream call failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// A rendered payload and its cache lifetime hint.
///
/// `lifetime == None` caches indefinitely; `Some(Duration::ZERO)` is never
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub body: Value,
    pub lifetime: Option<Duration>,
}

/// One upstream report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    ActiveStations,
    WaterLevelVerified,
    WaterLevelPreliminary,
    WaterLevelPredicted,
    ExtremaPredicted,
}

impl Report {
    /// Name reported in `X-TideServer-Api` and logs.
    pub fn api_name(self) -> &'static str {
        match self {
            Report::ActiveStations => "GetActiveStations",
            Report::WaterLevelVerified => "GetStationWaterLevelVerified",
            Report::WaterLevelPreliminary => "GetStationWaterLevelPreliminary",
            Report::WaterLevelPredicted => "GetStationWaterLevelPredicted",
            Report::ExtremaPredicted => "GetStationExtremaPredicted",
        }
    }

    /// Measured (not predicted) reports refuse dates that have not started yet.
    fn is_historical(self) -> bool {
        matches!(
            self,
            Report::WaterLevelVerified | Report::WaterLevelPreliminary
        )
    }

    pub async fn fetch(
        self,
        params: &PathParams,
        upstream: &dyn Upstream,
        clock: &dyn Clock,
    ) -> Result<FetchResult, ReportError> {
        match self {
            Report::ActiveStations => self.fetch_stations(upstream).await,
            _ => self.fetch_dated(params, upstream, clock).await,
        }
    }

    async fn fetch_stations(self, upstream: &dyn Upstream) -> Result<FetchResult, ReportError> {
        let stations = timed(self, upstream.active_stations()).await?;
        Ok(FetchResult {
            body: stations_to_json(&stations),
            lifetime: Some(THIRTY_DAYS),
        })
    }

    async fn fetch_dated(
        self,
        params: &PathParams,
        upstream: &dyn Upstream,
        clock: &dyn Clock,
    ) -> Result<FetchResult, ReportError> {
        let station_id = params
            .get("stationId")
            .ok_or(ReportError::MissingParameter("stationId"))?;
        let raw_date = params
            .get("date")
            .ok_or(ReportError::MissingParameter("date"))?;

        let now = clock.now();
        let date = parse_calendar_date(raw_date)?;
        let start = start_of_day(date);

        if self.is_historical() && now < start {
            return Err(ReportError::NotYetAvailable {
                available_at: start,
            });
        }

        if date < MIN_SERVICE_DATE {
            return Err(ReportError::BeforeMinimum {
                min: MIN_SERVICE_DATE,
            });
        }

        let request = self.upstream_params(station_id, raw_date);
        tracing::debug!(api = self.api_name(), station_id, date = raw_date, "Fetching report");

        let body = match self {
            Report::WaterLevelVerified => {
                let records = timed(self, upstream.water_level_verified(&request)).await?;
                normalize_series(station_id, date, &records)?
            }
            Report::WaterLevelPreliminary => {
                let records = timed(self, upstream.water_level_raw(&request)).await?;
                normalize_series(station_id, date, &records)?
            }
            Report::WaterLevelPredicted => {
                let records = timed(self, upstream.predictions(&request)).await?;
                normalize_series(station_id, date, &records)?
            }
            Report::ExtremaPredicted => {
                let days = timed(self, upstream.high_low_predictions(&request)).await?;
                normalize_extrema(station_id, date, &days)?
            }
            Report::ActiveStations => return self.fetch_stations(upstream).await,
        };

        let lifetime = if self.is_historical() {
            historical_lifetime(now, start)
        } else {
            predictive_lifetime(now, start)
        };

        Ok(FetchResult { body, lifetime })
    }

    fn upstream_params(self, station_id: &str, date: &str) -> UpstreamParams {
        let builder = UpstreamParams::builder()
            .station_id(station_id)
            .begin_date(date)
            .end_date(date);

        match self {
            // The high/low service treats 1/1 as UTC/meters, the reverse of
            // its documentation.
            Report::ExtremaPredicted => builder.time_zone(1).unit(1).build(),
            Report::WaterLevelPredicted => builder
                .data_interval(PREDICTION_INTERVAL_MINUTES)
                .build(),
            _ => builder.build(),
        }
    }
}

async fn timed<T>(
    report: Report,
    call: impl Future<Output = Result<T, UpstreamError>>,
) -> Result<T, UpstreamError> {
    let started = Instant::now();
    let result = call.await;
    tracing::info!(
        api = report.api_name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Upstream call finished"
    );
    result
}

/// Lifetime for measurements, keyed off how long ago `start` was.
pub fn historical_lifetime(now: DateTime<Utc>, start: DateTime<Utc>) -> Option<Duration> {
    let age = now - start;

    if age < delta(ONE_DAY) {
        Some(Duration::ZERO)
    } else if age < delta(SEVEN_DAYS) {
        Some(ONE_DAY)
    } else if age < delta(timefmt::ONE_YEAR) {
        Some(THIRTY_DAYS)
    } else {
        None
    }
}

/// Lifetime for predictions, keyed off how far ahead `start` is.
///
/// A date whose start has passed (today included) caches indefinitely.
pub fn predictive_lifetime(now: DateTime<Utc>, start: DateTime<Utc>) -> Option<Duration> {
    let ahead = start - now;

    if ahead < TimeDelta::zero() {
        None
    } else if ahead < delta(ONE_DAY) {
        Some(Duration::ZERO)
    } else if ahead < delta(SEVEN_DAYS) {
        Some(ONE_DAY)
    } else {
        Some(THIRTY_DAYS)
    }
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
