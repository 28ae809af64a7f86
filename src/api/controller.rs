//! Cache-aside controller.
//!
//! One request runs strictly in sequence: reject, cache lookup, live fetch,
//! store, respond. The first terminal step wins. A stale object read during
//! lookup is kept as the fallback if the live fetch fails.

use axum::http::Method;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{ApiError, NO_CACHE};
use super::models::{Request, Response};
use super::utils::{cache_enabled, cache_key, max_age_header, store_enabled};
use crate::clock::Clock;
use crate::observability::Metrics;
use crate::reports::{FetchResult, ReportRouter};
use crate::storage::{CacheObject, CacheStore, StorageError, content_etag};
use crate::timefmt::http_date;
use crate::upstream::Upstream;

const JSON_CONTENT_TYPE: &str = "application/json";

/// The request pipeline and its injected collaborators.
pub struct Pipeline {
    router: ReportRouter,
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn Upstream>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    prefix: String,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn Upstream>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            router: ReportRouter::new(),
            store,
            upstream,
            clock,
            metrics,
            prefix: prefix.into(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run `request` to completion. Failures become JSON error responses.
    pub async fn handle(&self, request: &Request) -> Response {
        match self.serve(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_client_error() {
                    self.metrics.client_error();
                    tracing::info!(path = %request.path, error = %err, "Client error");
                } else {
                    self.metrics.server_error();
                    tracing::error!(path = %request.path, error = %err, "Request failed");
                }
                err.to_response(request)
            }
        }
    }

    async fn serve(&self, request: &Request) -> Result<Response, ApiError> {
        if request.method != Method::GET && request.method != Method::HEAD {
            return Err(ApiError::MethodNotAllowed(request.method.to_string()));
        }

        if request.path.len() < 2 || !request.path.starts_with('/') {
            return Err(ApiError::NotFound(request.path.clone()));
        }

        let route = self
            .router
            .resolve(&request.path)
            .ok_or_else(|| ApiError::NotFound(request.path.clone()))?;
        let api = route.report.api_name();
        let key = cache_key(&self.prefix, &request.path);

        let mut response = Response::default();
        response.headers.insert("X-TideServer-Api", api);

        let mut fallback = None;
        if cache_enabled(&request.query) {
            match self.lookup(&key).await? {
                Some(object) if object.is_fresh(self.clock.now()) => {
                    self.metrics.cache_hit();
                    tracing::info!(key = %key, api, expires = ?object.expires, "Serving cached object");
                    return cached_response(response, object, false);
                }
                Some(object) => {
                    self.metrics.cache_stale_hit();
                    tracing::info!(key = %key, api, expires = ?object.expires, "Cached object is stale");
                    fallback = Some(object);
                }
                None => self.metrics.cache_miss(),
            }
        }

        self.metrics.upstream_call();
        let fetched = route
            .report
            .fetch(&route.params, self.upstream.as_ref(), self.clock.as_ref())
            .await;

        let FetchResult { body, lifetime } = match fetched {
            Ok(result) => result,
            Err(err) => {
                let err = ApiError::from(err);
                return match fallback {
                    Some(stale) => {
                        self.metrics.stale_fallback();
                        tracing::warn!(key = %key, api, error = %err, "Live fetch failed; serving stale object");
                        cached_response(response, stale, true)
                    }
                    None => Err(err),
                };
            }
        };

        let body = serde_json::to_string(&body).map_err(|e| ApiError::Internal(e.to_string()))?;
        let now = self.clock.now();
        let storable = store_enabled(&request.query) && lifetime != Some(Duration::ZERO);

        response
            .headers
            .insert("ETag", content_etag(body.as_bytes()));

        match lifetime {
            _ if !storable => {
                response.headers.insert("Cache-Control", NO_CACHE);
            }
            None => {
                response.headers.insert("Cache-Control", max_age_header());
            }
            Some(lifetime) => {
                response.headers.insert("Cache-Control", "public");
                if let Some(expires) = expiry(now, lifetime) {
                    response.headers.insert("Expires", http_date(expires));
                }
            }
        }

        if storable {
            let expires = lifetime.and_then(|l| expiry(now, l));
            self.store_object(&key, Bytes::from(body.clone()), expires).await;
        }

        response.body = body;
        Ok(response)
    }

    /// `Ok(None)` on a miss. Other store errors fail the request.
    async fn lookup(&self, key: &str) -> Result<Option<CacheObject>, ApiError> {
        let started = Instant::now();
        let result = self.store.get(key).await;
        tracing::debug!(key, elapsed_ms = started.elapsed().as_millis() as u64, "Cache read");

        match result {
            Ok(object) => Ok(Some(object)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(err) => {
                self.metrics.cache_read_error();
                tracing::error!(key, error = %err, "Cache read failed");
                Err(ApiError::from(err))
            }
        }
    }

    /// Write failures are logged and swallowed.
    async fn store_object(&self, key: &str, body: Bytes, expires: Option<DateTime<Utc>>) {
        let started = Instant::now();
        let result = self.store.put(key, body, JSON_CONTENT_TYPE, expires).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => tracing::info!(key, elapsed_ms, "Cached response"),
            Err(err) => {
                self.metrics.cache_write_failure();
                tracing::error!(key, error = %err, "Failed to cache response; returning it anyway");
            }
        }
    }
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(lifetime)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
}

/// Response from a stored object. `stale` objects are marked non-cacheable
/// but keep their stored ETag.
fn cached_response(
    mut response: Response,
    object: CacheObject,
    stale: bool,
) -> Result<Response, ApiError> {
    let body = String::from_utf8(object.body.to_vec()).map_err(|_| {
        ApiError::UpstreamUnavailable("Cached object is not valid UTF-8".to_string())
    })?;

    if let Some(content_type) = &object.content_type {
        response.headers.insert("Content-Type", content_type.as_str());
    }
    response.headers.insert("ETag", object.e_tag);

    match (stale, object.expires) {
        (true, _) => {
            response.headers.insert("Cache-Control", NO_CACHE);
        }
        (false, None) => {
            response.headers.insert("Cache-Control", max_age_header());
        }
        (false, Some(expires)) => {
            response.headers.insert("Cache-Control", "public");
            response.headers.insert("Expires", http_date(expires));
        }
    }

    response.body = body;
    Ok(response)
}
