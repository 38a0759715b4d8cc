//! Upload and auth relay library.

pub mod auth;
pub mod config;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod upload;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
