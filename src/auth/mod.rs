//! Authentication pass-through subsystem.
//!
//! # Data Flow
//! ```text
//! Browser /api/auth/{login,callback,me,logout}
//!     → token.rs (Authorization header captured as opaque BearerToken)
//!     → handlers.rs (one downstream call, same method, query/body unchanged)
//!     → reply relayed verbatim, or {"error": ...} with downstream status
//! ```
//!
//! # Design Decisions
//! - Token issuance and validation belong to the downstream service
//! - Tokens are never parsed, stored or logged

pub mod handlers;
pub mod token;

pub use handlers::AuthEndpoint;
pub use token::{BearerToken, ForwardedAuth};
