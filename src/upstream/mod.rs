//! Upstream CO-OPS data service.
//!
//! The pipeline only sees the [`Upstream`] trait: one call per report type,
//! taking the wire-level [`UpstreamParams`] and returning typed records.
//! [`SoapUpstream`] talks to the live SOAP services; [`ScriptedUpstream`]
//! serves canned records for tests and local runs.

mod mock;
mod soap;
mod types;
mod xml;

pub use mock::ScriptedUpstream;
pub use soap::SoapUpstream;
pub use types::{
    HighLowDay, HighLowRecord, PredictionRecord, RawRecord, Station, StationLocation,
    StationMetadata, StationParameter, UpstreamParams, VerifiedRecord,
};
pub use xml::XmlNode;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("upstream fault: {0}")]
    Fault(String),

    #[error("undecodable upstream response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// One blocking-style call per report type. A failure is terminal for the
/// call; implementations do not retry.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn active_stations(&self) -> Result<Vec<Station>>;

    async fn water_level_verified(&self, params: &UpstreamParams) -> Result<Vec<VerifiedRecord>>;

    async fn water_level_raw(&self, params: &UpstreamParams) -> Result<Vec<RawRecord>>;

    async fn predictions(&self, params: &UpstreamParams) -> Result<Vec<PredictionRecord>>;

    async fn high_low_predictions(&self, params: &UpstreamParams) -> Result<Vec<HighLowDay>>;
}
