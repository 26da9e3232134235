//! Fault injection for exercising error-rate dashboards.

use crate::http::response::{json, json_error, HttpResponse, MessageBody};
use crate::http::ApiError;
use crate::state::AppState;
use bytes::Bytes;
use hyper::{Request, StatusCode};
use rand::Rng;
use tracing::error;

/// `GET /api/error-test`
///
/// Fails with a 500 on roughly half of all calls.
pub fn error_test(_state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    if rand::thread_rng().gen_bool(0.5) {
        error!("simulated error triggered");
        return Ok(json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
    }

    Ok(json(
        StatusCode::OK,
        &MessageBody {
            status: "success",
            message: "No error this time",
        },
    ))
}
