//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Downstream base URL override.
pub const ENV_API_URL: &str = "API_URL";
/// Listener address override.
pub const ENV_BIND_ADDRESS: &str = "RELAY_BIND_ADDRESS";
/// Transient upload directory override.
pub const ENV_UPLOAD_DIR: &str = "RELAY_UPLOAD_DIR";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given, otherwise start from defaults. Environment
/// overrides and validation apply either way.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = RelayConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_API_URL) {
        config.downstream.base_url = url;
    }
    if let Some(addr) = get(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(dir) = get(ENV_UPLOAD_DIR) {
        config.uploads.temp_dir = Some(PathBuf::from(dir));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = RelayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_API_URL, "https://analysis.internal"),
                (ENV_BIND_ADDRESS, "127.0.0.1:4000"),
                (ENV_UPLOAD_DIR, "/srv/uploads"),
            ]),
        );

        assert_eq!(config.downstream.base_url, "https://analysis.internal");
        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.uploads.temp_dir, Some(PathBuf::from("/srv/uploads")));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, env(&[(ENV_API_URL, "  ")]));
        assert_eq!(config.downstream.base_url, "http://localhost:8000");
    }

    #[test]
    fn loads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[listener]\nbind_address = \"127.0.0.1:3900\"\n[uploads]\nmax_body_size = 1024"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.uploads.max_body_size, 1024);
    }

    #[test]
    fn reports_parse_and_validation_errors() {
        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "[listener\nbind_address = 1").unwrap();
        assert!(matches!(load_config(broken.path()), Err(ConfigError::Parse(_))));

        let mut invalid = tempfile::NamedTempFile::new().unwrap();
        writeln!(invalid, "[uploads]\nmax_body_size = 0").unwrap();
        let err = load_config(invalid.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("uploads.max_body_size"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
