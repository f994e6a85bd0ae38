//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`vs_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vs_media::unsatisfied_content_range;

/// Message returned to clients for 5xx errors; details go to the log only.
const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: vs_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: vs_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn inner(&self) -> &vs_core::Error {
        &self.inner
    }
}

impl From<vs_core::Error> for AppError {
    fn from(e: vs_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<vs_media::RangeError> for AppError {
    fn from(e: vs_media::RangeError) -> Self {
        Self::new(e.into())
    }
}

fn error_code(err: &vs_core::Error) -> &'static str {
    use vs_core::Error;
    match err {
        Error::NotFound { .. } => "not_found",
        Error::Validation(_) => "validation_error",
        Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
        Error::Forbidden(_) => "forbidden",
        Error::Conflict(_) => "conflict",
        Error::Database { .. } => "database_error",
        Error::Io { .. } => "io_error",
        Error::Tool { .. } => "tool_error",
        Error::Transcode(_) => "transcode_error",
        Error::Inconsistency(_) => "inconsistency",
        Error::Internal(_) => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                request_id = ?self.request_id,
                "Server error in API handler"
            );
            if self.inner.requires_manual_intervention() {
                // Names the affected file for the operator.
                self.inner.to_string()
            } else {
                GENERIC_SERVER_ERROR.to_string()
            }
        } else {
            self.inner.to_string()
        };

        let mut body = json!({
            "error": message,
            "code": error_code(&self.inner),
            "request_id": self.request_id,
        });
        if self.inner.requires_manual_intervention() {
            body["manual_intervention_required"] = json!(true);
        }

        let mut response = (status, axum::Json(body)).into_response();

        if let vs_core::Error::RangeNotSatisfiable { size } = &self.inner {
            if let Ok(val) = HeaderValue::from_str(&unsatisfied_content_range(*size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, val);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(vs_core::Error::not_found("video", "abc.mp4"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_produces_403() {
        let response = AppError::new(vs_core::Error::Forbidden("dir".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn range_not_satisfiable_carries_content_range() {
        let response =
            AppError::new(vs_core::Error::RangeNotSatisfiable { size: 500 }).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes */500"
        );
    }

    #[test]
    fn range_error_converts() {
        let err: AppError = vs_media::RangeError::Malformed("bytes=x".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn server_errors_hide_detail() {
        let response =
            AppError::new(vs_core::Error::Internal("secret path /srv/x".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], GENERIC_SERVER_ERROR);
        assert_eq!(body["code"], "internal_error");
        assert!(body.get("manual_intervention_required").is_none());
    }

    #[tokio::test]
    async fn inconsistency_is_flagged_for_operators() {
        let response =
            AppError::new(vs_core::Error::Inconsistency("abc.mp4".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["manual_intervention_required"], true);
        assert_eq!(body["code"], "inconsistency");
        assert!(body["error"].as_str().unwrap().contains("abc.mp4"));
    }

    #[tokio::test]
    async fn client_errors_keep_message() {
        let response = AppError::new(vs_core::Error::Validation("bad".into()))
            .with_request_id("req-123".into())
            .into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation error: bad");
        assert_eq!(body["request_id"], "req-123");
    }
}
