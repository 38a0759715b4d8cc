//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml (optional)
//!     → loader.rs (parse, deserialize, apply API_URL / RELAY_* overrides)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → RelayContext built from it, shared via ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new RelayContext swapped in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults so the relay runs with no file at all
//! - Listener, timeout, body-limit and CORS layers are fixed at startup;
//!   reload only affects the downstream client, upload store and entry page

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    CorsConfig, DownstreamConfig, ListenerConfig, LogFormat, ObservabilityConfig, RelayConfig,
    SecurityConfig, SiteConfig, TimeoutConfig, TlsConfig, UploadConfig,
};
pub use validation::{validate_config, ValidationError};
