use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{ErrorBody, ErrorEnvelope, Request, Response};
use crate::reports::ReportError;
use crate::storage::StorageError;
use crate::timefmt::http_date;

/// Client errors may be cached briefly by downstream caches.
const CLIENT_ERROR_CACHE_CONTROL: &str = "public, max-age=3600";
pub(crate) const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method {0} is not allowed")]
    MethodNotAllowed(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("{0}")]
    InvalidRange(String),
    #[error("{message}")]
    NotYetAvailable {
        message: String,
        retry_after: DateTime<Utc>,
    },
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("{0}")]
    UpstreamContractViolation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidRange(_) | ApiError::NotYetAvailable { .. } => StatusCode::FORBIDDEN,
            ApiError::UpstreamUnavailable(_) | ApiError::UpstreamContractViolation(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason phrase reported as `Code` in the error body.
    pub fn code(&self) -> &'static str {
        self.status_code().canonical_reason().unwrap_or("Unknown")
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Headers specific to this error, applied after the defaults.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self {
            ApiError::NotYetAvailable { retry_after, .. } => {
                vec![("Retry-After", http_date(*retry_after))]
            }
            _ => Vec::new(),
        }
    }

    /// Render as a JSON error response for `request`.
    pub fn to_response(&self, request: &Request) -> Response {
        let mut response = Response {
            status: self.status_code(),
            ..Response::default()
        };

        let cache_control = if self.is_client_error() {
            CLIENT_ERROR_CACHE_CONTROL
        } else {
            NO_CACHE
        };
        response.headers.insert("Cache-Control", cache_control);

        for (name, value) in self.headers() {
            response.headers.insert(name, value);
        }

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                resource: request.path.clone(),
                request_id: request.request_id.clone(),
                encoded_stack_trace: String::new(),
            },
        };
        response.body = serde_json::to_string(&envelope).unwrap_or_default();

        response
    }
}

impl From<ReportError> for ApiError {
    fn from(value: ReportError) -> Self {
        match value {
            ReportError::InvalidDate(e) => ApiError::InvalidFormat(e.to_string()),
            e @ ReportError::BeforeMinimum { .. } => ApiError::InvalidRange(e.to_string()),
            ReportError::NotYetAvailable { available_at } => ApiError::NotYetAvailable {
                message: "Data is not yet available".to_string(),
                retry_after: available_at,
            },
            e @ ReportError::MissingParameter(_) => ApiError::Internal(e.to_string()),
            e @ ReportError::Upstream(_) => ApiError::UpstreamUnavailable(e.to_string()),
            e @ ReportError::Normalize(_) => ApiError::UpstreamContractViolation(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(key) => ApiError::NotFound(key),
            _ => ApiError::UpstreamUnavailable(
                "An internal error occurred while serving your request".to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeError;
    use crate::upstream::UpstreamError;
    use axum::http::Method;
    use chrono::TimeZone;

    fn request() -> Request {
        Request::new(Method::GET, "/station/1/water-level/20990101/verified", "req-1")
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::MethodNotAllowed("POST".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(ApiError::InvalidFormat("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidRange("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::UpstreamContractViolation("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_not_yet_available_sets_retry_after() {
        let err = ApiError::NotYetAvailable {
            message: "Data is not yet available".to_string(),
            retry_after: Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap(),
        };
        let response = err.to_response(&request());

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers.get("Retry-After"),
            Some("Thu, 01 Jan 2099 00:00:00 GMT")
        );
        assert_eq!(response.headers.get("Cache-Control"), Some(CLIENT_ERROR_CACHE_CONTROL));
    }

    #[test]
    fn test_error_body_shape() {
        let response = ApiError::UpstreamUnavailable("down".into()).to_response(&request());
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();

        assert_eq!(body["Error"]["Code"], "Bad Gateway");
        assert_eq!(body["Error"]["Message"], "down");
        assert_eq!(body["Error"]["Resource"], "/station/1/water-level/20990101/verified");
        assert_eq!(body["Error"]["RequestId"], "req-1");
        assert_eq!(body["Error"]["EncodedStackTrace"], "");
        assert_eq!(response.headers.get("Cache-Control"), Some(NO_CACHE));
        assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_report_error_mapping() {
        let err: ApiError = ReportError::Normalize(NormalizeError::NoData {
            station_id: "1".into(),
        })
        .into();
        assert!(matches!(err, ApiError::UpstreamContractViolation(_)));

        let err: ApiError = ReportError::Upstream(UpstreamError::Status { status: 500 }).into();
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));

        let err: ApiError = ReportError::InvalidDate(
            crate::timefmt::TimeFormatError::InvalidFormat("bad".into()),
        )
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_error_hides_store_details() {
        let err: ApiError = StorageError::Configuration("bucket tides-prod denied".into()).into();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.to_string().contains("tides-prod"));
    }
}
