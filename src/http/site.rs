//! Entry page, health and fallback handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Html,
    BoxError, Json,
};
use serde::Serialize;

use crate::http::response::RelayError;
use crate::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.context().index_html.clone())
}

/// `GET /health`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> RelayError {
    RelayError::rejected(StatusCode::NOT_FOUND, "Not found")
}

pub async fn method_not_allowed() -> RelayError {
    RelayError::rejected(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Render failures raised by the outer middleware stack, chiefly the request timeout.
pub async fn request_failed(err: BoxError) -> RelayError {
    if err.is::<tower::timeout::error::Elapsed>() {
        RelayError::rejected(StatusCode::REQUEST_TIMEOUT, "Request timed out")
    } else {
        RelayError::internal("Request failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_deadline_is_request_timeout() {
        let err: BoxError = Box::new(tower::timeout::error::Elapsed::new());
        let rendered = request_failed(err).await;

        assert_eq!(rendered.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(rendered.user_message(), "Request timed out");
    }

    #[tokio::test]
    async fn other_middleware_errors_are_internal() {
        let err: BoxError = "listener gone".into();
        let rendered = request_failed(err).await;

        assert_eq!(rendered.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rendered.user_message(), "Request failed");
    }
}
