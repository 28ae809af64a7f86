use axum::{
    Json,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    models::{HealthResponse, HttpMap, Request, Response},
    state::AppState,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Every non-health path goes through the report pipeline.
///
/// The inbound request is converted into the pipeline's own [`Request`]
/// (case-insensitive query and headers, correlation id) and the accumulated
/// [`Response`] is converted back. `HEAD` runs the same pipeline; the server
/// drops the body.
pub async fn serve_report(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> axum::response::Response {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let query: HttpMap = match query {
        Ok(Query(pairs)) => pairs.into_iter().collect(),
        Err(rejection) => {
            tracing::warn!(%request_id, error = %rejection, "Ignoring malformed query string");
            HttpMap::new()
        }
    };

    let headers: HttpMap = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let request = Request::new(method, uri.path(), request_id)
        .with_query(query)
        .with_headers(headers);

    let span = tracing::info_span!("request", request_id = %request.request_id, path = %request.path);
    let response = state.pipeline.handle(&request).instrument(span).await;
    into_http(response)
}

/// Convert the pipeline response into an axum response.
pub fn into_http(response: Response) -> axum::response::Response {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (name, value) in response.headers.iter() {
        builder = builder.header(name, value);
    }

    builder.body(Body::from(response.body)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Response headers were not valid HTTP");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

/// Liveness probe (GET /health)
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
