//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned and echoed)
//!     → handlers (site.rs, auth, upload) using the state.rs snapshot
//!     → response.rs (errors rendered as {"error": message})
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod site;
pub mod state;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ErrorBody, RelayError};
pub use server::HttpServer;
pub use state::{AppState, ContextError, RelayContext};
