//! Logging initialization and configuration.

use crate::config::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// `RUST_LOG`, when set, takes precedence over `level`.
///
/// # Arguments
///
/// * `level` - Log level filter (e.g., "info", "debug")
/// * `format` - Log output format (json or pretty)
pub fn init_logging(level: &str, format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_current_span(false))
                .init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty()).init();
        }
    }
}
