//! Shared application state.

use crate::config::Config;
use crate::metrics::AppMetrics;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// State shared by every request handler.
pub struct AppState {
    /// Service name reported by the home endpoint.
    app_name: String,

    /// Version reported by the home endpoint.
    version: String,

    /// When the state was created, for the health endpoint's uptime.
    started: Instant,

    /// Registry and instrument handles.
    metrics: AppMetrics,

    /// Cleared once graceful shutdown begins.
    ready: AtomicBool,

    /// Last id handed out to a created item.
    last_item_id: AtomicU64,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: &Config, metrics: AppMetrics) -> Self {
        Self {
            app_name: config.app.name.clone(),
            version: config.app.version.clone(),
            started: Instant::now(),
            metrics,
            ready: AtomicBool::new(true),
            last_item_id: AtomicU64::new(0),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    /// Whether the service should receive traffic.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Stop advertising readiness.
    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Allocate an id for a new item.
    ///
    /// Ids are wall-clock milliseconds, bumped so that they strictly increase
    /// within the process.
    pub fn next_item_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let previous = self
            .last_item_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}
