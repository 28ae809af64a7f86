//! Request pipeline counters.
//!
//! Counters are kept in process and mirrored to `tracing` at debug level;
//! shipping them anywhere else is left to the deployment.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording pipeline counters
#[derive(Debug, Default)]
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_stale_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_read_errors: AtomicU64,
    cache_write_failures: AtomicU64,
    stale_fallbacks: AtomicU64,
    upstream_calls: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }

    pub fn cache_hit(&self) {
        Self::bump(&self.cache_hits, "cache_hit");
    }

    pub fn cache_stale_hit(&self) {
        Self::bump(&self.cache_stale_hits, "cache_stale_hit");
    }

    pub fn cache_miss(&self) {
        Self::bump(&self.cache_misses, "cache_miss");
    }

    pub fn cache_read_error(&self) {
        Self::bump(&self.cache_read_errors, "cache_read_error");
    }

    pub fn cache_write_failure(&self) {
        Self::bump(&self.cache_write_failures, "cache_write_failure");
    }

    pub fn stale_fallback(&self) {
        Self::bump(&self.stale_fallbacks, "stale_fallback");
    }

    pub fn upstream_call(&self) {
        Self::bump(&self.upstream_calls, "upstream_call");
    }

    pub fn client_error(&self) {
        Self::bump(&self.client_errors, "client_error");
    }

    pub fn server_error(&self) {
        Self::bump(&self.server_errors, "server_error");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_stale_hits: self.cache_stale_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_read_errors: self.cache_read_errors.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_stale_hits: u64,
    pub cache_misses: u64,
    pub cache_read_errors: u64,
    pub cache_write_failures: u64,
    pub stale_fallbacks: u64,
    pub upstream_calls: u64,
    pub client_errors: u64,
    pub server_errors: u64,
}
