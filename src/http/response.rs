//! Error responses.
//!
//! # Responsibilities
//! - Map relay failures to HTTP status codes
//! - Render every failure as `{"error": "<message>"}`
//! - Log the full cause server-side, never send it to the browser
//!
//! # Design Decisions
//! - Internal failures carry a user-safe message separate from their source
//! - Log level follows severity: internal → error, downstream → warn, client → debug

use std::error::Error as StdError;

use axum::{
    extract::{multipart::MultipartError, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

type BoxError = Box<dyn StdError + Send + Sync>;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Client input rejected before contacting downstream.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Downstream answered with an error status.
    #[error("downstream returned {status}: {message}")]
    Downstream { status: StatusCode, message: String },

    /// Relay-side or transport failure. `message` is what the browser sees.
    #[error("{message}: {source}")]
    Internal {
        message: &'static str,
        #[source]
        source: BoxError,
    },
}

impl RelayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::rejected(StatusCode::BAD_REQUEST, message)
    }

    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        RelayError::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: &'static str, source: impl Into<BoxError>) -> Self {
        RelayError::Internal {
            message,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Rejected { status, .. } | RelayError::Downstream { status, .. } => *status,
            RelayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the browser.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Rejected { message, .. } | RelayError::Downstream { message, .. } => {
                message.clone()
            }
            RelayError::Internal { message, .. } => (*message).to_string(),
        }
    }
}

impl From<MultipartError> for RelayError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::rejected(status, "Uploaded file is too large")
        } else if status.is_client_error() {
            RelayError::rejected(status, format!("Invalid multipart body: {}", err.body_text()))
        } else {
            RelayError::internal("Failed to process file", err)
        }
    }
}

impl From<BytesRejection> for RelayError {
    fn from(rejection: BytesRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::rejected(status, "Request body is too large")
        } else if status.is_client_error() {
            RelayError::rejected(status, rejection.body_text())
        } else {
            RelayError::internal("Failed to read request body", rejection)
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::internal("Failed to process file", err)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Internal { .. } => tracing::error!(error = %self, "Relay failure"),
            RelayError::Downstream { .. } => tracing::warn!(error = %self, "Downstream rejected request"),
            RelayError::Rejected { .. } => tracing::debug!(error = %self, "Client error"),
        }

        let status = self.status_code();
        (
            status,
            Json(ErrorBody {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}
