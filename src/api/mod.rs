//! The service's HTTP endpoints.

mod faults;
mod items;
mod system;

pub use items::{fixed_items, Item, ItemStatus};

use crate::http::Router;

/// Paths served by the API routes (the metrics path is configurable and
/// must not collide with any of these).
pub const API_ROUTE_PATHS: &[&str] = &["/", "/health", "/ready", "/api/items", "/api/error-test"];

/// Build the routing table, serving the scrape endpoint at `metrics_path`.
pub fn router(metrics_path: &str) -> Router {
    Router::new()
        .get("/", system::home)
        .get("/health", system::health)
        .get("/ready", system::ready)
        .get(metrics_path, system::metrics)
        .get("/api/items", items::list_items)
        .post("/api/items", items::create_item)
        .get("/api/error-test", faults::error_test)
}
