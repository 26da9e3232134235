//! Request accounting middleware.
//!
//! Wraps the downstream handler future: increments the active connections
//! gauge and starts a timer before it runs, then records one histogram
//! observation and one counter increment labelled `(method, route,
//! status_code)` and releases the gauge when it completes. Requests to the
//! scrape path are passed through untouched.
//!
//! The gauge is released by a drop guard, so a request whose future is
//! dropped before completing (client went away) does not leak the gauge. Such
//! a request has no status code and is not counted.

use crate::http::response::HttpResponse;
use crate::http::router::normalize_path;
use crate::metrics::HttpMetrics;
use hyper::Method;
use std::future::Future;
use std::sync::Arc;

/// What the downstream pipeline produced for a request.
pub struct Routed {
    pub response: HttpResponse,
    /// Pattern of the matched route, `None` if no route matched.
    pub route: Option<Arc<str>>,
}

/// Accounting middleware configured for one scrape path.
#[derive(Clone)]
pub struct RequestAccounting {
    metrics: HttpMetrics,
    scrape_path: String,
}

impl RequestAccounting {
    pub fn new(metrics: HttpMetrics, scrape_path: &str) -> Self {
        Self {
            metrics,
            scrape_path: normalize_path(scrape_path).to_string(),
        }
    }

    /// Whether requests to `path` bypass accounting.
    pub fn is_excluded(&self, path: &str) -> bool {
        normalize_path(path) == self.scrape_path
    }

    /// Run `next`, accounting for it unless `path` is the scrape path.
    ///
    /// Unmatched requests are labelled with their raw path.
    pub async fn instrument<F>(&self, method: &Method, path: &str, next: F) -> HttpResponse
    where
        F: Future<Output = Routed>,
    {
        if self.is_excluded(path) {
            return next.await.response;
        }

        let tracker = self.metrics.start_request();
        let Routed { response, route } = next.await;

        let route = route.as_deref().unwrap_or(path);
        tracker.finish(method.as_str(), route, response.status().as_u16());

        response
    }
}
