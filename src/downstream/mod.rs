//! Downstream API subsystem.
//!
//! # Data Flow
//! ```text
//! handler (auth proxy / upload relay)
//!     → client.rs (build request, attach Outbound token + request ID)
//!     → resilience::timeouts (per-call deadline)
//!     → reply.rs (status + raw body)
//!     → handler decides: relay verbatim or map to RelayError
//! ```
//!
//! # Design Decisions
//! - Credentials are passed per call, never stored on the client
//! - Success bodies are relayed byte-for-byte after a JSON syntax check
//! - One call per browser action; no retries

pub mod client;
pub mod reply;

pub use client::{DownstreamClient, ForwardRequest, Outbound, ANALYZE_PATH};
pub use reply::DownstreamReply;

use axum::http::StatusCode;

use crate::resilience::DeadlineExceeded;

/// Failure talking to the downstream API.
#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("invalid downstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build downstream request: {0}")]
    Client(#[source] reqwest::Error),

    #[error("downstream unreachable: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("downstream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("downstream call timed out: {0}")]
    Timeout(#[source] DeadlineExceeded),

    #[error("downstream returned malformed JSON with status {status}: {source}")]
    MalformedBody {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read upload artifact: {0}")]
    Artifact(#[source] std::io::Error),
}

impl DownstreamError {
    /// Classify an error raised while sending or reading a response.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            DownstreamError::Connect(err)
        } else if err.is_builder() {
            DownstreamError::Client(err)
        } else {
            DownstreamError::Transport(err)
        }
    }
}
