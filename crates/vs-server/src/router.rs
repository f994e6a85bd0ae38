//! Axum router construction.
//!
//! Builds the full application router with all route groups and
//! middleware layers.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::access_log::access_log_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Answers 408 once a request has run for `limit`.
fn request_timeout(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = request_timeout(Duration::from_secs(ctx.config.server.request_timeout_secs));
    let body_limit =
        usize::try_from(ctx.config.server.max_upload_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        .route(
            "/videos",
            get(routes::videos::list_videos).delete(routes::videos::delete_video),
        )
        .route("/videos/stream", get(routes::stream::stream_video))
        .route_layer(timeout)
        // Uploads are bounded by the body limit instead of the request timeout.
        .route(
            "/videos",
            post(routes::videos::upload_video).layer(DefaultBodyLimit::max(body_limit)),
        );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/hls/{asset}", get(routes::hls::hls_missing_file))
        .route("/hls/{asset}/{*file}", get(routes::hls::hls_asset))
        .nest("/api", api)
        .layer(middleware::from_fn(access_log_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
