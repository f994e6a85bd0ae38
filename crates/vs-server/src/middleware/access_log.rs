//! One log line per request, with the level chosen by response status.

use std::time::Instant;

use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Log method, path, `Range` header, status and latency for every request.
///
/// 5xx responses log at `error`, 4xx at `warn`, everything else at `info`.
pub async fn access_log_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let range = request
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    let range = range.as_deref().unwrap_or("-");

    if response.status().is_server_error() {
        tracing::error!(%method, %path, range, status, latency_ms, "request");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, range, status, latency_ms, "request");
    } else {
        tracing::info!(%method, %path, range, status, latency_ms, "request");
    }

    response
}
