//! Configuration data types.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Application identity reported by the home endpoint
    #[serde(default)]
    pub app: AppConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Socket address the HTTP server binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.server.listen_addr()
    }
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Json,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on (overridden by `PORT`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,

    /// How long to keep accepting after shutdown starts, with `/ready`
    /// answering 503, so load balancers can stop routing traffic here
    #[serde(default = "default_readiness_grace", with = "humantime_serde")]
    pub readiness_grace: Duration,

    /// How long to wait for in-flight connections on shutdown
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
            readiness_grace: default_readiness_grace(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Human readable service name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Reported version (overridden by `APP_VERSION`)
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Path of the scrape endpoint; requests to it are not accounted
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Name prefix shared by the default runtime metrics
    #[serde(default = "default_runtime_prefix")]
    pub runtime_prefix: String,

    /// Value of the `app` label attached to the runtime metrics
    #[serde(default = "default_app_name")]
    pub app_label: String,

    /// How often the scheduler lag probe wakes up
    #[serde(default = "default_lag_probe_interval", with = "humantime_serde")]
    pub lag_probe_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            runtime_prefix: default_runtime_prefix(),
            app_label: default_app_name(),
            lag_probe_interval: default_lag_probe_interval(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    100 * 1024
}

fn default_readiness_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_app_name() -> String {
    "kubedemo".to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_runtime_prefix() -> String {
    "runtime".to_string()
}

fn default_lag_probe_interval() -> Duration {
    Duration::from_millis(500)
}

/// Custom serde module for humantime durations.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
