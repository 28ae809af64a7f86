//! Request, response and error body models for the report API.
//!
//! [`Request`] is the pipeline's view of an inbound call, independent of the
//! HTTP framework; [`Response`] accumulates status, headers and body as the
//! pipeline runs. Header and query maps are case-insensitive.

use axum::http::{Method, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordered map with case-insensitive keys. The spelling of the most recent
/// insert is kept for output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpMap {
    entries: BTreeMap<String, (String, String)>,
}

impl HttpMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(key: &str) -> String {
        key.to_ascii_lowercase()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&Self::normalize(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&Self::normalize(key))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(Self::normalize(&key), (key, value.into()))
            .map(|(_, old)| old)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries
            .remove(&Self::normalize(key))
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HttpMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HttpMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Inbound request. Immutable once built.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HttpMap,
    pub headers: HttpMap,
    pub request_id: String,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HttpMap::new(),
            headers: HttpMap::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_query(mut self, query: HttpMap) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: HttpMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Response accumulator owned by one in-flight request.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HttpMap,
    pub body: String,
}

impl Default for Response {
    fn default() -> Self {
        let mut headers = HttpMap::new();
        headers.insert("Content-Type", mime::APPLICATION_JSON.to_string());

        Self {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }
}

/// `{"Error": {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "Error")]
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
    /// Opaque encrypted trace; empty unless an encoder is configured.
    pub encoded_stack_trace: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
