//! API utility functions
//!
//! Pure, stateless helpers for the cache-aside pipeline: query flag parsing,
//! cache key derivation and cache header values.

use super::models::HttpMap;
use crate::timefmt::THIRTY_DAYS;

/// `Cache-Control` for objects with no expiry.
pub fn max_age_header() -> String {
    format!("public, max-age={}", THIRTY_DAYS.as_secs())
}

/// Common spellings of "false": anything starting with `f`, `n` or `0`.
pub fn is_false_value(value: &str) -> bool {
    value.starts_with(['f', 'F', 'n', 'N', '0'])
}

/// Cache lookup is on unless `no-cache` is present or `cache` is false.
pub fn cache_enabled(query: &HttpMap) -> bool {
    flag_enabled(query, "no-cache", "cache")
}

/// Cache store is on unless `no-store` is present or `store` is false.
pub fn store_enabled(query: &HttpMap) -> bool {
    flag_enabled(query, "no-store", "store")
}

fn flag_enabled(query: &HttpMap, negative: &str, positive: &str) -> bool {
    if query.contains_key(negative) {
        return false;
    }
    !query.get(positive).is_some_and(is_false_value)
}

/// Object key for a request path: `prefix` plus the path without its leading `/`.
pub fn cache_key(prefix: &str, path: &str) -> String {
    format!("{prefix}{}", path.strip_prefix('/').unwrap_or(path))
}
