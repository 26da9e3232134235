//! Response construction helpers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

/// Response type produced by every handler.
pub type HttpResponse = Response<Full<Bytes>>;

/// `{status, message}` body used for errors and plain acknowledgements.
#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub status: &'a str,
    pub message: &'a str,
}

/// `{status, data}` body used for successful payloads.
#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataBody<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// Build a response with the given content type.
pub fn with_content_type(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Serialize `body` as a JSON response.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_content_type(status, "application/json", bytes),
        Err(e) => {
            error!(error = %e, "failed to serialize response body");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `{status: "error", message}` JSON response.
pub fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    json(
        status,
        &MessageBody {
            status: "error",
            message,
        },
    )
}

/// Plain text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(status, "text/plain; charset=utf-8", body)
}
