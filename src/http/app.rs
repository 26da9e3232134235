//! Application service: the per-request pipeline.
//!
//! For each request: assign a request id, run the accounting middleware
//! around routing + body collection + the handler, convert handler errors and
//! panics into responses, and emit one access log event.

use crate::api;
use crate::config::Config;
use crate::http::accounting::{RequestAccounting, Routed};
use crate::http::error::ApiError;
use crate::http::response::HttpResponse;
use crate::http::router::{Handler, Router};
use crate::metrics::AppMetrics;
use crate::state::AppState;
use crate::util::{RequestId, REQUEST_ID_HEADER};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::Request;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The HTTP application. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    state: Arc<AppState>,
    router: Router,
    accounting: RequestAccounting,
    body_limit: usize,
}

impl App {
    /// Create the application with the service's API routes.
    pub fn new(config: &Config, metrics: AppMetrics) -> Self {
        let router = api::router(&config.metrics.path);
        Self::with_router(config, metrics, router)
    }

    /// Create the application with a custom routing table.
    pub fn with_router(config: &Config, metrics: AppMetrics, router: Router) -> Self {
        let accounting = RequestAccounting::new(metrics.http().clone(), &config.metrics.path);
        let state = Arc::new(AppState::new(config, metrics));

        Self {
            inner: Arc::new(AppInner {
                state,
                router,
                accounting,
                body_limit: config.server.body_limit,
            }),
        }
    }

    /// Shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.inner.state
    }

    /// Handle one request.
    pub async fn handle<B>(&self, req: Request<B>, client: Option<SocketAddr>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let request_id = RequestId::from_headers(req.headers());
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let mut response = self
            .inner
            .accounting
            .instrument(&method, &path, self.dispatch(req))
            .await;

        if let Some(value) = request_id.to_header_value() {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), value);
        }

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            client = ?client,
            "HTTP request"
        );

        response
    }

    /// Route the request, collect its body and run the handler.
    async fn dispatch<B>(&self, req: Request<B>) -> Routed
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(matched) = self.inner.router.at(&method, &path) else {
            let error = ApiError::NotFound;
            error.log(method.as_str(), &path);
            return Routed {
                response: error.into_response(),
                route: None,
            };
        };

        let (parts, body) = req.into_parts();
        let result = match read_body(body, self.inner.body_limit).await {
            Ok(bytes) => {
                let req = Request::from_parts(parts, bytes);
                call_handler(matched.handler, &self.inner.state, &req)
            }
            Err(e) => Err(e),
        };

        let response = result.unwrap_or_else(|error| {
            error.log(method.as_str(), &path);
            error.into_response()
        });

        Routed {
            response,
            route: Some(matched.pattern),
        }
    }
}

/// Run a handler, turning a panic into an internal error.
fn call_handler(
    handler: Handler,
    state: &AppState,
    req: &Request<Bytes>,
) -> Result<HttpResponse, ApiError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(state, req))) {
        Ok(result) => result,
        Err(payload) => Err(ApiError::internal(format!(
            "handler panicked: {}",
            panic_message(&*payload)
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Collect a request body, enforcing `limit` bytes.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::PayloadTooLarge { limit }),
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            Err(ApiError::bad_request("Failed to read request body"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::http::response::text;
    use http_body_util::Full;
    use hyper::{Method, StatusCode};

    fn boom(_: &AppState, _: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
        panic!("boom");
    }

    fn fails(_: &AppState, _: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
        Err(ApiError::internal("connection refused"))
    }

    fn echo_len(_: &AppState, req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
        Ok(text(StatusCode::OK, req.body().len().to_string()))
    }

    fn app(router: Router) -> App {
        let mut config = Config::default();
        config.server.body_limit = 16;
        let metrics = AppMetrics::new(&MetricsConfig::default()).unwrap();
        App::with_router(&config, metrics, router)
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn body_string(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_panic_becomes_500_and_is_counted() {
        let app = app(Router::new().get("/boom", boom));
        let http = app.state().metrics().http().clone();

        let response = app.handle(request(Method::GET, "/boom", ""), None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            r#"{"status":"error","message":"Internal server error"}"#
        );
        assert_eq!(http.request_count("GET", "/boom", 500), 1);
        assert_eq!(http.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_leak_details() {
        let app = app(Router::new().get("/fails", fails));
        let response = app.handle(request(Method::GET, "/fails", ""), None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_string(response).await.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let app = app(Router::new().post("/echo", echo_len));
        let http = app.state().metrics().http().clone();

        let response = app
            .handle(request(Method::POST, "/echo", "0123456789"), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "10");

        let response = app
            .handle(request(Method::POST, "/echo", "0123456789abcdefXYZ"), None)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_string(response).await,
            r#"{"status":"error","message":"Payload too large"}"#
        );
        assert_eq!(http.request_count("POST", "/echo", 413), 1);
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let app = app(Router::new().get("/", echo_len));

        let response = app.handle(request(Method::GET, "/", ""), None).await;
        let generated = response.headers()[&REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(generated.len(), 36);

        let mut req = request(Method::GET, "/", "");
        req.headers_mut()
            .insert(&REQUEST_ID_HEADER, "abc-123".parse().unwrap());
        let response = app.handle(req, None).await;
        assert_eq!(response.headers()[&REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn test_unmatched_route() {
        let app = app(Router::new());
        let http = app.state().metrics().http().clone();

        let response = app.handle(request(Method::GET, "/missing", ""), None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(http.request_count("GET", "/missing", 404), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*payload), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*payload), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
