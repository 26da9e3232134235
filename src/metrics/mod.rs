//! Metrics collection and exposition.

mod business;
mod http;
mod registry;
mod runtime;

pub use business::{BusinessMetrics, ItemOperation};
pub use http::{HttpLabels, HttpMetrics, RequestTracker, DURATION_BUCKETS};
pub use registry::{
    GroupRegistrar, MetricsError, MetricsRegistry, Snapshot, OPENMETRICS_CONTENT_TYPE,
};
pub use runtime::RuntimeMetrics;

use crate::config::MetricsConfig;
use std::sync::Arc;

/// The service's registry together with handles to every instrument in it.
///
/// Built once at startup and handed to the HTTP layer; tests build their own.
#[derive(Clone)]
pub struct AppMetrics {
    registry: Arc<MetricsRegistry>,
    http: HttpMetrics,
    business: BusinessMetrics,
    runtime: RuntimeMetrics,
}

impl AppMetrics {
    /// Create a registry and register all instruments.
    pub fn new(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let registry = MetricsRegistry::new();

        let runtime = RuntimeMetrics::register(&registry, &config.runtime_prefix, &config.app_label)?;
        let http = HttpMetrics::register(&registry)?;
        let business = BusinessMetrics::register(&registry)?;

        Ok(Self {
            registry: Arc::new(registry),
            http,
            business,
            runtime,
        })
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    pub fn http(&self) -> &HttpMetrics {
        &self.http
    }

    pub fn business(&self) -> &BusinessMetrics {
        &self.business
    }

    pub fn runtime(&self) -> &RuntimeMetrics {
        &self.runtime
    }

    /// Sample the runtime gauges and render the whole registry.
    pub fn snapshot(&self) -> Result<Snapshot, MetricsError> {
        self.runtime.refresh();
        self.registry.snapshot()
    }
}
