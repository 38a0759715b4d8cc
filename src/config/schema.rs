//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Downstream address used when neither the config file nor `API_URL` set one.
pub const DEFAULT_DOWNSTREAM_URL: &str = "http://localhost:8000";

/// Root configuration for the upload relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Downstream analysis/identity API.
    pub downstream: DownstreamConfig,

    /// Transient upload storage.
    pub uploads: UploadConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Cross-origin settings for browsers served from another origin.
    pub cors: CorsConfig,

    /// Entry page settings.
    pub site: SiteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum requests handled concurrently (backpressure).
    pub max_in_flight_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tls: None,
            max_in_flight_requests: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Downstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base URL of the downstream API. Path prefixes are kept.
    pub base_url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for one downstream call (send + full body) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DOWNSTREAM_URL.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

/// Transient upload storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory for transient artifacts. Defaults to `<tmp>/upload-relay`.
    pub temp_dir: Option<PathBuf>,

    /// Multipart field carrying the file.
    pub field_name: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl UploadConfig {
    /// Directory artifacts are written to.
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("upload-relay"))
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            field_name: "file".to_string(),
            max_body_size: 20 * 1024 * 1024, // 20MB
        }
    }
}

/// Timeout configuration for the browser-facing side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed `downstream.request_timeout_secs`.
    pub request_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 90,
            shutdown_grace_secs: 10,
        }
    }
}

/// CORS configuration. An empty origin list disables the CORS layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Entry page configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// HTML file served at `/` instead of the built-in page.
    pub index_path: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config.downstream.base_url, DEFAULT_DOWNSTREAM_URL);
        assert_eq!(config.uploads.field_name, "file");
        assert!(config.timeouts.request_secs > config.downstream.request_timeout_secs);
        assert!(config.listener.tls.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [downstream]
            base_url = "https://api.example.com/v1"

            [observability]
            log_format = "json"

            [cors]
            allowed_origins = ["http://localhost:5173"]
            "#,
        )
        .unwrap();

        assert_eq!(config.downstream.base_url, "https://api.example.com/v1");
        assert_eq!(config.downstream.connect_timeout_secs, 5);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn temp_dir_falls_back_to_system_tmp() {
        let uploads = UploadConfig::default();
        assert!(uploads.resolved_temp_dir().starts_with(std::env::temp_dir()));

        let uploads = UploadConfig {
            temp_dir: Some(PathBuf::from("/var/lib/relay")),
            ..UploadConfig::default()
        };
        assert_eq!(uploads.resolved_temp_dir(), PathBuf::from("/var/lib/relay"));
    }
}
