//! Request ID handling for request tracing.
//!
//! Every response carries an `x-request-id` header. A well-formed id supplied
//! by the client (or an upstream proxy) is propagated; otherwise a fresh
//! UUID is generated.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

/// Header used to carry the request id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest accepted incoming request id.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID wrapper that can be included in tracing spans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Take the id from the request headers, generating one if it is absent
    /// or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| is_valid_request_id(value))
            .map(|value| Self(value.to_string()))
            .unwrap_or_default()
    }

    /// Get the request ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header value for the response.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accept short ids made of visible ASCII characters.
fn is_valid_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic())
}
