//! Method + path routing table.
//!
//! Routes are exact paths. A trailing slash on the request path is ignored.
//! The registered pattern (not the raw path) is what the accounting
//! middleware uses as the `route` label.

use crate::http::error::ApiError;
use crate::http::response::HttpResponse;
use crate::state::AppState;
use bytes::Bytes;
use hyper::{Method, Request};
use std::sync::Arc;

/// A request handler. Bodies are collected before dispatch.
pub type Handler = fn(&AppState, &Request<Bytes>) -> Result<HttpResponse, ApiError>;

/// A single routing table entry.
#[derive(Clone)]
struct Route {
    method: Method,
    pattern: Arc<str>,
    handler: Handler,
}

/// Result of a successful route lookup.
#[derive(Clone)]
pub struct RouteMatch {
    /// The pattern the request matched, e.g. `/api/items`.
    pub pattern: Arc<str>,
    /// The handler to invoke.
    pub handler: Handler,
}

/// Routing table, matched in registration order.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route.
    pub fn route(mut self, method: Method, pattern: &str, handler: Handler) -> Self {
        self.routes.push(Route {
            method,
            pattern: Arc::from(pattern),
            handler,
        });
        self
    }

    /// Add a `GET` route.
    pub fn get(self, pattern: &str, handler: Handler) -> Self {
        self.route(Method::GET, pattern, handler)
    }

    /// Add a `POST` route.
    pub fn post(self, pattern: &str, handler: Handler) -> Self {
        self.route(Method::POST, pattern, handler)
    }

    /// Find the route for a request.
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .find(|route| route.method == *method && pattern_matches(&route.pattern, path))
            .map(|route| RouteMatch {
                pattern: Arc::clone(&route.pattern),
                handler: route.handler,
            })
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the router has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strip a single trailing slash, keeping the root path intact.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    normalize_path(pattern) == normalize_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::text;
    use hyper::StatusCode;

    fn ok(_: &AppState, _: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
        Ok(text(StatusCode::OK, "ok"))
    }

    fn router() -> Router {
        Router::new()
            .get("/", ok)
            .get("/api/items", ok)
            .post("/api/items", ok)
    }

    #[test]
    fn test_static_match() {
        let router = router();
        let matched = router.at(&Method::GET, "/api/items").unwrap();
        assert_eq!(&*matched.pattern, "/api/items");
        assert!(router.at(&Method::GET, "/api/other").is_none());
    }

    #[test]
    fn test_method_mismatch() {
        let router = router();
        assert!(router.at(&Method::POST, "/").is_none());
        assert!(router.at(&Method::DELETE, "/api/items").is_none());
    }

    #[test]
    fn test_sub_path_does_not_match() {
        let router = router();
        assert!(router.at(&Method::GET, "/api/items/42").is_none());
        assert!(router.at(&Method::GET, "/api").is_none());
    }

    #[test]
    fn test_trailing_slash_reports_registered_pattern() {
        let router = router();
        let matched = router.at(&Method::GET, "/api/items/").unwrap();
        assert_eq!(&*matched.pattern, "/api/items");
    }

    #[test]
    fn test_trailing_slash() {
        let router = router();
        assert!(router.at(&Method::GET, "/api/items/").is_some());
        assert!(router.at(&Method::GET, "/").is_some());
        assert_eq!(normalize_path("/metrics/"), "/metrics");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_root_does_not_match_everything() {
        let router = Router::new().get("/", ok);
        assert!(router.at(&Method::GET, "/health").is_none());
        assert_eq!(router.len(), 1);
    }
}
