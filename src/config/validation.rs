//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check cross-field constraints (outer timeout exceeds downstream deadline)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_in_flight_requests == 0 {
        errors.push(ValidationError::new(
            "listener.max_in_flight_requests",
            "must be greater than 0",
        ));
    }

    match Url::parse(&config.downstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::new(
                    "downstream.base_url",
                    "must not carry a query or fragment",
                ));
            }
        }
        Ok(url) => errors.push(ValidationError::new(
            "downstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "downstream.base_url",
            format!("invalid URL: {}", e),
        )),
    }
    if config.downstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "downstream.connect_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.downstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "downstream.request_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.timeouts.request_secs <= config.downstream.request_timeout_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must be greater than downstream.request_timeout_secs ({})",
                config.downstream.request_timeout_secs
            ),
        ));
    }

    if config.uploads.field_name.trim().is_empty() {
        errors.push(ValidationError::new("uploads.field_name", "must not be empty"));
    }
    if config.uploads.max_body_size == 0 {
        errors.push(ValidationError::new(
            "uploads.max_body_size",
            "must be greater than 0",
        ));
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() || Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    if !matches!(
        config.observability.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
