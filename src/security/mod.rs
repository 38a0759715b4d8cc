//! Security subsystem.
//!
//! # Components
//! - `headers.rs`: hardening response headers
//! - `cors.rs`: allowed browser origins
//! - `limits.rs`: in-flight request budget
//!
//! # Design Decisions
//! - Relay never exposes internal paths, downstream URLs or tokens in responses
//! - Security headers enabled by default

pub mod cors;
pub mod headers;
pub mod limits;

pub use cors::cors_layer;
pub use limits::{limit_in_flight, InFlightLimiter};
