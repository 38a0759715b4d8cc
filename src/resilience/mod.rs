//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to downstream:
//!     → timeouts.rs (enforce per-call deadline)
//!     → failure surfaces to the handler as DownstreamError::Timeout
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every downstream call has a deadline
//! - No retries: one browser action maps to exactly one downstream call

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded};
