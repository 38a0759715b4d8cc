//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the config watcher when running from a file
//! - Bind the listener and serve until a termination signal
//! - Bound the drain phase by the shutdown grace period

use std::net::{AddrParseError, SocketAddr};
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::RelayConfig;
use crate::http::{ContextError, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{self, ListenerError};
use crate::observability::init_metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build relay context: {0}")]
    Context(#[from] ContextError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to watch config file: {0}")]
    Watcher(#[from] notify::Error),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run the relay until SIGINT/SIGTERM, then drain.
pub async fn run(config: RelayConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let server = HttpServer::new(config)?;
    let listener = net::bind(&server.config().listener).await?;

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
            tracing::warn!("Server stopped before a shutdown signal");
            return Ok(());
        }
        signal = signals::wait_for_signal() => {
            tracing::info!(signal, grace_secs = grace.as_secs(), "Shutdown signal received, draining requests");
        }
    }

    shutdown.trigger();
    match tokio::time::timeout(grace, &mut server_task).await {
        Ok(result) => result??,
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Grace period elapsed, abandoning in-flight requests"
            );
            server_task.abort();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
