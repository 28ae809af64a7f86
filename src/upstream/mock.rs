use super::{
    HighLowDay, PredictionRecord, RawRecord, Result, Station, Upstream, UpstreamError,
    UpstreamParams, VerifiedRecord,
};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-process upstream serving canned records.
///
/// Counts every call and remembers the last parameters, so tests can assert
/// whether (and how) the upstream was reached. A failure injected with
/// [`ScriptedUpstream::fail_with`] is returned by every call until
/// [`ScriptedUpstream::recover`].
#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    stations: Vec<Station>,
    verified: Vec<VerifiedRecord>,
    raw: Vec<RawRecord>,
    predictions: Vec<PredictionRecord>,
    high_low: Vec<HighLowDay>,
    failure: Mutex<Option<UpstreamError>>,
    calls: AtomicUsize,
    last_params: Mutex<Option<UpstreamParams>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stations(mut self, stations: Vec<Station>) -> Self {
        self.stations = stations;
        self
    }

    pub fn with_verified(mut self, records: Vec<VerifiedRecord>) -> Self {
        self.verified = records;
        self
    }

    pub fn with_raw(mut self, records: Vec<RawRecord>) -> Self {
        self.raw = records;
        self
    }

    pub fn with_predictions(mut self, records: Vec<PredictionRecord>) -> Self {
        self.predictions = records;
        self
    }

    pub fn with_high_low(mut self, days: Vec<HighLowDay>) -> Self {
        self.high_low = days;
        self
    }

    pub fn fail_with(&self, error: UpstreamError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<UpstreamParams> {
        self.last_params.lock().ok().and_then(|p| p.clone())
    }

    fn record(&self, params: Option<&UpstreamParams>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut last) = self.last_params.lock() {
            *last = params.cloned();
        }

        match self.failure.lock() {
            Ok(failure) => failure.clone().map_or(Ok(()), Err),
            Err(_) => Err(UpstreamError::Transport("scripted upstream poisoned".to_string())),
        }
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn active_stations(&self) -> Result<Vec<Station>> {
        self.record(None)?;
        Ok(self.stations.clone())
    }

    async fn water_level_verified(&self, params: &UpstreamParams) -> Result<Vec<VerifiedRecord>> {
        self.record(Some(params))?;
        Ok(self.verified.clone())
    }

    async fn water_level_raw(&self, params: &UpstreamParams) -> Result<Vec<RawRecord>> {
        self.record(Some(params))?;
        Ok(self.raw.clone())
    }

    async fn predictions(&self, params: &UpstreamParams) -> Result<Vec<PredictionRecord>> {
        self.record(Some(params))?;
        Ok(self.predictions.clone())
    }

    async fn high_low_predictions(&self, params: &UpstreamParams) -> Result<Vec<HighLowDay>> {
        self.record(Some(params))?;
        Ok(self.high_low.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_calls_and_injects_failures() {
        let upstream = ScriptedUpstream::new();
        assert!(upstream.active_stations().await.unwrap().is_empty());
        assert_eq!(upstream.calls(), 1);

        upstream.fail_with(UpstreamError::Fault("down".to_string()));
        assert!(upstream.active_stations().await.is_err());
        assert_eq!(upstream.calls(), 2);

        upstream.recover();
        assert!(upstream.active_stations().await.is_ok());
    }

    #[tokio::test]
    async fn test_remembers_last_params() {
        let upstream = ScriptedUpstream::new();
        let params = UpstreamParams::builder()
            .station_id("9447130")
            .begin_date("20200101")
            .end_date("20200101")
            .build();

        upstream.predictions(&params).await.unwrap();
        assert_eq!(upstream.last_params(), Some(params));
    }
}
