//! Home, probe and scrape endpoints.

use crate::http::response::{json, with_content_type, HttpResponse};
use crate::http::ApiError;
use crate::state::AppState;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use serde::Serialize;
use std::time::SystemTime;
use tracing::info;

#[derive(Debug, Serialize)]
struct HomeResponse<'a> {
    status: &'static str,
    message: String,
    version: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: f64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
}

/// `GET /`
pub fn home(state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    info!("home page accessed");

    Ok(json(
        StatusCode::OK,
        &HomeResponse {
            status: "success",
            message: format!("Welcome to {}!", state.app_name()),
            version: state.version(),
            timestamp: humantime::format_rfc3339_millis(SystemTime::now()).to_string(),
        },
    ))
}

/// `GET /health`
///
/// Liveness: answers 200 for as long as the process can serve requests.
pub fn health(state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    Ok(json(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy",
            uptime: state.uptime().as_secs_f64(),
        },
    ))
}

/// `GET /ready`
///
/// Readiness: 503 once graceful shutdown has started.
pub fn ready(state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    if state.is_ready() {
        Ok(json(StatusCode::OK, &ReadyResponse { status: "ready" }))
    } else {
        Ok(json(
            StatusCode::SERVICE_UNAVAILABLE,
            &ReadyResponse {
                status: "not ready",
            },
        ))
    }
}

/// `GET /metrics`
pub fn metrics(state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    let snapshot = state.metrics().snapshot()?;
    Ok(with_content_type(
        StatusCode::OK,
        snapshot.content_type,
        snapshot.body,
    ))
}
