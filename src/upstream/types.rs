use bon::Builder;

/// Datum used by every water level request (mean lower low water).
pub const DATUM_MLLW: &str = "MLLW";

/// Wire-level parameters shared by the dated CO-OPS services.
///
/// `time_zone` and `unit` are the raw codes sent to the service; callers are
/// responsible for the per-service encoding.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct UpstreamParams {
    #[builder(into)]
    pub station_id: String,
    #[builder(into)]
    pub begin_date: String,
    #[builder(into)]
    pub end_date: String,
    #[builder(default)]
    pub time_zone: u8,
    #[builder(into, default = DATUM_MLLW.to_string())]
    pub datum: String,
    #[builder(default)]
    pub unit: u8,
    /// Sampling interval in minutes; only the predictions service takes one.
    pub data_interval: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// Upstream `ID` attribute. The service swaps this with `name`.
    pub id: String,
    pub name: String,
    pub metadata: StationMetadata,
    pub parameters: Vec<StationParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationMetadata {
    pub date_established: String,
    pub location: StationLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationLocation {
    pub lat: f64,
    pub long: f64,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationParameter {
    pub name: String,
    pub dcp: i64,
    pub sensor_id: String,
    pub status: i64,
}

/// One six-minute verified water level sample. Indicator fields are non-zero
/// when the condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedRecord {
    pub timestamp: String,
    pub water_level: f64,
    pub sigma: f64,
    /// `I`
    pub inferred: i32,
    /// `F`
    pub flat_tolerance: i32,
    /// `R`
    pub rate_of_change: i32,
    /// `T`
    pub temperature: i32,
}

/// One six-minute preliminary water level sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: String,
    pub water_level: f64,
    pub sigma: f64,
    /// `O`: samples outside three standard deviations.
    pub outside_three_sigma: i32,
    /// `F`
    pub flat_tolerance: i32,
    /// `R`
    pub rate_of_change: i32,
    /// `L`
    pub limit_exceeded: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub timestamp: String,
    pub prediction: f64,
}

/// Predicted extrema for one upstream day.
#[derive(Debug, Clone, PartialEq)]
pub struct HighLowDay {
    pub date: String,
    pub extrema: Vec<HighLowRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighLowRecord {
    pub time: String,
    pub prediction: f64,
    /// `H`, `HH`, `L` or `LL`.
    pub kind: String,
}
