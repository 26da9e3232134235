//! HTTP request instruments.
//!
//! Provides the request duration histogram, the request counter, and the
//! active connections gauge, plus the [`RequestTracker`] guard used by the
//! accounting middleware.

use crate::metrics::{MetricsError, MetricsRegistry};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Duration histogram buckets, in seconds.
pub const DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

/// Labels shared by the duration histogram and the request counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub route: String,
    pub status_code: String,
}

impl HttpLabels {
    pub fn new(method: &str, route: &str, status: u16) -> Self {
        Self {
            method: method.to_string(),
            route: route.to_string(),
            status_code: status.to_string(),
        }
    }
}

/// Handles to the HTTP instruments.
#[derive(Clone)]
pub struct HttpMetrics {
    inner: Arc<HttpMetricsInner>,
}

struct HttpMetricsInner {
    /// Request duration histogram (in seconds).
    request_duration_seconds: Family<HttpLabels, Histogram>,
    /// Completed requests counter.
    requests_total: Family<HttpLabels, Counter>,
    /// Requests currently being handled.
    active_connections: Gauge,
}

impl HttpMetrics {
    /// Create the HTTP instruments and register them.
    pub fn register(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.into_iter())
            });
        let requests_total = Family::<HttpLabels, Counter>::default();
        let active_connections = Gauge::default();

        registry.register(
            "http_request_duration_seconds",
            "Duration of HTTP requests in seconds",
            request_duration_seconds.clone(),
        )?;
        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            requests_total.clone(),
        )?;
        registry.register(
            "http_active_connections",
            "Number of active HTTP connections",
            active_connections.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(HttpMetricsInner {
                request_duration_seconds,
                requests_total,
                active_connections,
            }),
        })
    }

    /// Mark a request as started. The returned guard releases the active
    /// connection slot when dropped, whether or not it was finished.
    pub fn start_request(&self) -> RequestTracker {
        self.inner.active_connections.inc();
        RequestTracker {
            metrics: self.clone(),
            start: Instant::now(),
        }
    }

    /// Record a completed request.
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        let labels = HttpLabels::new(method, route, status);
        self.inner
            .request_duration_seconds
            .get_or_create(&labels)
            .observe(duration.as_secs_f64());
        self.inner.requests_total.get_or_create(&labels).inc();
    }

    /// Number of completed requests recorded for the label set.
    ///
    /// Does not create the series when it has not been observed yet.
    pub fn request_count(&self, method: &str, route: &str, status: u16) -> u64 {
        let labels = HttpLabels::new(method, route, status);
        self.inner
            .requests_total
            .get(&labels)
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Current value of the active connections gauge.
    pub fn active_connections(&self) -> i64 {
        self.inner.active_connections.get()
    }
}

/// In-flight request guard.
pub struct RequestTracker {
    metrics: HttpMetrics,
    start: Instant,
}

impl RequestTracker {
    /// Get the elapsed duration.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record the request outcome and release the active connection slot.
    pub fn finish(self, method: &str, route: &str, status: u16) {
        let duration = self.start.elapsed();
        self.metrics.record_request(method, route, status, duration);
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        self.metrics.inner.active_connections.dec();
    }
}
