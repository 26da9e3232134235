//! Default process and async runtime metrics.
//!
//! Registered once under a configurable prefix with a constant `app` label.
//! Process values are sampled when [`RuntimeMetrics::refresh`] runs (on every
//! scrape); scheduler lag is measured by a background probe task.

use crate::metrics::{MetricsError, MetricsRegistry};
use prometheus_client::metrics::gauge::Gauge;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

type FloatGauge = Gauge<f64, AtomicU64>;

/// Runtime instruments.
#[derive(Clone)]
pub struct RuntimeMetrics {
    inner: Arc<RuntimeMetricsInner>,
}

struct RuntimeMetricsInner {
    started: std::time::Instant,
    start_time_seconds: FloatGauge,
    uptime_seconds: FloatGauge,
    resident_memory_bytes: Gauge,
    virtual_memory_bytes: Gauge,
    cpu_seconds: FloatGauge,
    open_fds: Gauge,
    threads: Gauge,
    tokio_workers: Gauge,
    tokio_alive_tasks: Gauge,
    scheduler_lag_seconds: FloatGauge,
}

impl RuntimeMetrics {
    /// Create the runtime instruments and register them as a group.
    pub fn register(
        registry: &MetricsRegistry,
        prefix: &str,
        app_label: &str,
    ) -> Result<Self, MetricsError> {
        let inner = RuntimeMetricsInner {
            started: std::time::Instant::now(),
            start_time_seconds: FloatGauge::default(),
            uptime_seconds: FloatGauge::default(),
            resident_memory_bytes: Gauge::default(),
            virtual_memory_bytes: Gauge::default(),
            cpu_seconds: FloatGauge::default(),
            open_fds: Gauge::default(),
            threads: Gauge::default(),
            tokio_workers: Gauge::default(),
            tokio_alive_tasks: Gauge::default(),
            scheduler_lag_seconds: FloatGauge::default(),
        };

        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        inner.start_time_seconds.set(start_time);

        registry.register_group(prefix, ("app", app_label), |group| {
            group.register(
                "start_time_seconds",
                "Start time of the process since unix epoch in seconds",
                inner.start_time_seconds.clone(),
            )?;
            group.register(
                "uptime_seconds",
                "Seconds since the process started",
                inner.uptime_seconds.clone(),
            )?;
            group.register(
                "resident_memory_bytes",
                "Resident memory size in bytes",
                inner.resident_memory_bytes.clone(),
            )?;
            group.register(
                "virtual_memory_bytes",
                "Virtual memory size in bytes",
                inner.virtual_memory_bytes.clone(),
            )?;
            group.register(
                "cpu_seconds",
                "Total user and system CPU time spent in seconds",
                inner.cpu_seconds.clone(),
            )?;
            group.register(
                "open_fds",
                "Number of open file descriptors",
                inner.open_fds.clone(),
            )?;
            group.register("threads", "Number of OS threads", inner.threads.clone())?;
            group.register(
                "tokio_workers",
                "Number of async runtime worker threads",
                inner.tokio_workers.clone(),
            )?;
            group.register(
                "tokio_alive_tasks",
                "Number of live tasks on the async runtime",
                inner.tokio_alive_tasks.clone(),
            )?;
            group.register(
                "scheduler_lag_seconds",
                "Delay of the last scheduler probe wakeup past its deadline",
                inner.scheduler_lag_seconds.clone(),
            )
        })?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Sample process and runtime values into the gauges.
    pub fn refresh(&self) {
        let inner = &self.inner;
        inner
            .uptime_seconds
            .set(inner.started.elapsed().as_secs_f64());

        if let Some(stats) = ProcessStats::read() {
            inner.resident_memory_bytes.set(stats.resident_bytes);
            inner.virtual_memory_bytes.set(stats.virtual_bytes);
            inner.cpu_seconds.set(stats.cpu_seconds);
            inner.open_fds.set(stats.open_fds);
            inner.threads.set(stats.threads);
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let metrics = handle.metrics();
            inner.tokio_workers.set(metrics.num_workers() as i64);
            inner.tokio_alive_tasks.set(metrics.num_alive_tasks() as i64);
        }
    }

    /// Seconds since these metrics were created.
    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    /// Last measured scheduler lag in seconds.
    pub fn scheduler_lag_seconds(&self) -> f64 {
        self.inner.scheduler_lag_seconds.get()
    }

    /// Spawn the scheduler lag probe.
    ///
    /// Every `interval` the probe sleeps until a deadline and records how late
    /// it was woken up. Stops when `shutdown` fires.
    pub fn spawn_lag_probe(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let metrics = self.clone();

        tokio::spawn(async move {
            loop {
                let deadline = tokio::time::Instant::now() + interval;
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let lag = tokio::time::Instant::now().saturating_duration_since(deadline);
                        metrics.inner.scheduler_lag_seconds.set(lag.as_secs_f64());
                    }
                    _ = shutdown.recv() => {
                        debug!("scheduler lag probe stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// A sample of process resource usage.
#[derive(Debug)]
struct ProcessStats {
    resident_bytes: i64,
    virtual_bytes: i64,
    cpu_seconds: f64,
    open_fds: i64,
    threads: i64,
}

impl ProcessStats {
    #[cfg(target_os = "linux")]
    fn read() -> Option<Self> {
        let process = match procfs::process::Process::myself() {
            Ok(process) => process,
            Err(e) => {
                debug!(error = %e, "failed to open process stats");
                return None;
            }
        };
        let stat = process.stat().ok()?;

        Some(Self {
            resident_bytes: (stat.rss * procfs::page_size()) as i64,
            virtual_bytes: stat.vsize as i64,
            cpu_seconds: (stat.utime + stat.stime) as f64 / procfs::ticks_per_second() as f64,
            open_fds: process.fd_count().map(|n| n as i64).unwrap_or(0),
            threads: stat.num_threads,
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn read() -> Option<Self> {
        None
    }
}
