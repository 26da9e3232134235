//! Configuration loading.
//!
//! Values are layered: built-in defaults, then the optional YAML file, then
//! the `PORT` and `APP_VERSION` environment variables.

use crate::config::{validate_config, Config};
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Environment variable overriding `app.version`.
pub const APP_VERSION_ENV: &str = "APP_VERSION";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("invalid value for environment variable {name}: {value:?}")]
    EnvError { name: &'static str, value: String },

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a YAML file, apply environment overrides, and validate.
///
/// When `path` is `None` the built-in defaults are used as the base layer.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&contents)?
        }
        None => Config::default(),
    };

    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;

    validate_config(&config).map_err(ConfigError::ValidationError)?;

    Ok(config)
}

/// Apply environment variable overrides using the given lookup function.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(PORT_ENV) {
        config.server.port = value.trim().parse().map_err(|_| ConfigError::EnvError {
            name: PORT_ENV,
            value: value.clone(),
        })?;
    }

    if let Some(value) = lookup(APP_VERSION_ENV) {
        if !value.is_empty() {
            config.app.version = value;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
server:
  port: 8080
app:
  name: demo
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.app.name, "demo");
        assert_eq!(config.app.version, "1.0.0");

        assert!(load_config(Some(file.path())).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/path/config.yaml")));
        assert!(matches!(result.unwrap_err(), ConfigError::ReadError(_)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not: valid: yaml: {{{}}}").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"metrics:\n  path: metrics\n").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_env_overrides(
            Config::default(),
            env(&[("PORT", "8081"), ("APP_VERSION", "2.3.4")]),
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.app.version, "2.3.4");
    }

    #[test]
    fn test_env_defaults_when_unset() {
        let config = apply_env_overrides(Config::default(), env(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.app.version, "1.0.0");
    }

    #[test]
    fn test_invalid_port_env() {
        let result = apply_env_overrides(Config::default(), env(&[("PORT", "http")]));
        match result.unwrap_err() {
            ConfigError::EnvError { name, value } => {
                assert_eq!(name, "PORT");
                assert_eq!(value, "http");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
