//! kubedemo - a small HTTP service instrumented for Prometheus
//!
//! This crate provides:
//! - Home, liveness and readiness endpoints for orchestrator probes
//! - A demo items API and a fault-injection endpoint
//! - A metrics registry with request accounting, business and runtime instruments
//! - Graceful shutdown with connection draining

pub mod api;
pub mod config;
pub mod http;
pub mod metrics;
pub mod server;
pub mod state;
pub mod util;

pub use config::Config;
