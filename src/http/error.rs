//! Request-level errors and their HTTP mapping.

use crate::http::response::{json_error, text, HttpResponse};
use crate::metrics::MetricsError;
use hyper::StatusCode;
use thiserror::Error;
use tracing::{error, warn};

/// Errors a handler (or the pipeline around it) can end a request with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("route not found")]
    NotFound,

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Metrics(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the error: client errors at warn, server errors at error.
    pub fn log(&self, method: &str, path: &str) {
        match self {
            ApiError::BadRequest(_) | ApiError::PayloadTooLarge { .. } => {
                warn!(method, path, error = %self, "rejected request");
            }
            ApiError::NotFound => {
                warn!(method, path, "route not found");
            }
            ApiError::Metrics(e) => {
                error!(error = %e, "metrics error");
            }
            ApiError::Internal(message) => {
                error!(method, path, error = %message, "unhandled error");
            }
        }
    }

    /// Convert into a response. Internal details are never exposed, except
    /// for metrics rendering failures which return the raw message.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status();
        match self {
            ApiError::BadRequest(message) => json_error(status, &message),
            ApiError::PayloadTooLarge { .. } => json_error(status, "Payload too large"),
            ApiError::NotFound => json_error(status, "Route not found"),
            ApiError::Metrics(e) => text(status, e.to_string()),
            ApiError::Internal(_) => json_error(status, "Internal server error"),
        }
    }
}
