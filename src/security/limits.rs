//! Request limits.
//!
//! # Responsibilities
//! - Bound the number of requests handled at once
//! - Bound request body size (via axum's `DefaultBodyLimit`, see server.rs)
//!
//! # Design Decisions
//! - Excess requests wait for a permit instead of being rejected
//! - The permit is held until the response is produced

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;

use crate::http::response::RelayError;

/// Shared in-flight request budget.
#[derive(Debug, Clone)]
pub struct InFlightLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl InFlightLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// Middleware holding one permit per request.
pub async fn limit_in_flight(
    State(limiter): State<InFlightLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = match limiter.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return RelayError::rejected(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
                .into_response()
        }
    };

    next.run(request).await
}
