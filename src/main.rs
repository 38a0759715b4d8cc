//! Upload and auth relay.
//!
//! A thin HTTP shim between a browser client and a downstream analysis API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                         RELAY                              Downstream API
//!     ───────                         ─────                              ──────────────
//!     GET /            ───▶  site (embedded entry page)
//!     /api/auth/*      ───▶  auth handlers ─── one call ────────────▶  /auth/*
//!     POST /upload     ───▶  upload handler
//!                              → artifact (transient file on disk)
//!                              → spawned task ── multipart ─────────▶  /analyze
//!                              → artifact removed
//!     JSON reply       ◀───  relayed verbatim, or {"error": ...}
//!
//!     Cross-cutting: config (+ hot reload), observability, security,
//!                    resilience (deadlines), lifecycle (startup/shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;

use upload_relay::{config, lifecycle, observability};

#[derive(Parser)]
#[command(name = "upload-relay", version)]
#[command(about = "Relay browser uploads and auth calls to the analysis API", long_about = None)]
struct Args {
    /// Path to the TOML config file; defaults and environment overrides apply without one.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    observability::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        downstream = %config.downstream.base_url,
        upload_dir = %config.uploads.resolved_temp_dir().display(),
        request_timeout_secs = config.timeouts.request_secs,
        config_file = ?args.config,
        "upload-relay starting"
    );

    lifecycle::run(config, args.config.as_deref()).await?;
    Ok(())
}
