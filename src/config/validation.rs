//! Configuration validation.

use crate::api::API_ROUTE_PATHS;
use crate::config::Config;
use crate::http::normalize_path;

/// Validate the configuration.
///
/// Checks for:
/// - A known log level
/// - A metrics path that is absolute and does not shadow an API route
/// - A runtime metric prefix that is a valid metric name
/// - Non-empty application name and metrics app label
/// - A non-zero body limit
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    let metrics_path = &config.metrics.path;
    if !metrics_path.starts_with('/') {
        errors.push(format!("metrics path '{}' must start with '/'", metrics_path));
    } else if API_ROUTE_PATHS.contains(&normalize_path(metrics_path)) {
        errors.push(format!(
            "metrics path '{}' collides with an API route",
            metrics_path
        ));
    }

    if !is_valid_metric_name(&config.metrics.runtime_prefix) {
        errors.push(format!(
            "runtime metric prefix '{}' is not a valid metric name",
            config.metrics.runtime_prefix
        ));
    }

    if config.metrics.app_label.is_empty() {
        errors.push("metrics app label cannot be empty".to_string());
    }

    if config.app.name.is_empty() {
        errors.push("app name cannot be empty".to_string());
    }

    if config.server.body_limit == 0 {
        errors.push("server body limit must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Metric names follow `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.global.log_level = "verbose".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("invalid log level"));
    }

    #[test]
    fn test_relative_metrics_path() {
        let mut config = Config::default();
        config.metrics.path = "metrics".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("must start with '/'"));
    }

    #[test]
    fn test_metrics_path_collision() {
        let mut config = Config::default();
        config.metrics.path = "/health".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("collides"));
    }

    #[test]
    fn test_bad_runtime_prefix() {
        let mut config = Config::default();
        config.metrics.runtime_prefix = "9lives".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("runtime metric prefix"));
    }

    #[test]
    fn test_multiple_errors_reported() {
        let mut config = Config::default();
        config.app.name.clear();
        config.metrics.app_label.clear();
        config.server.body_limit = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("app name"));
        assert!(err.contains("app label"));
        assert!(err.contains("body limit"));
        assert_eq!(err.matches("; ").count(), 2);
    }

    #[test]
    fn test_metric_name_rules() {
        assert!(is_valid_metric_name("runtime"));
        assert!(is_valid_metric_name("node_js:x"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("has-dash"));
    }
}
