use std::sync::Arc;

use super::controller::Pipeline;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::observability::Metrics;
use crate::storage::{CacheStore, StorageClient, StorageError};
use crate::upstream::{SoapUpstream, Upstream, UpstreamError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to initialize storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to initialize upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Wire the pipeline from explicit collaborators. Only the storage prefix
    /// is read from `config`.
    pub fn new(
        config: &Config,
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn Upstream>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pipeline = Pipeline::new(
            store,
            upstream,
            clock,
            Arc::new(Metrics::new()),
            config.storage.prefix.clone(),
        );

        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Configured object store, live SOAP upstream and wall clock.
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let store = StorageClient::from_config(&config.storage)?;
        let upstream = SoapUpstream::new(&config.upstream)?;

        tracing::info!(
            provider = ?config.storage.provider,
            bucket = %store.bucket,
            upstream = %config.upstream.base_url,
            "Initialized collaborators"
        );

        Ok(Self::new(
            &config,
            Arc::new(store),
            Arc::new(upstream),
            Arc::new(SystemClock),
        ))
    }
}
