//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report the bound address (useful when binding to port 0)
//!
//! # Design Decisions
//! - Concurrency is bounded per request by `security::limits`, not per connection

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address {address:?}: {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

/// Bind a TCP listener to `config.bind_address`.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(
            address = %local_addr,
            max_in_flight_requests = config.max_in_flight_requests,
            tls = config.tls.is_some(),
            "Listener bound"
        );
    }

    Ok(listener)
}
