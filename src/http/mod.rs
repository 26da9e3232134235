//! HTTP application layer: routing, request accounting and the service pipeline.

mod accounting;
mod app;
mod error;
pub mod response;
mod router;

pub use accounting::{RequestAccounting, Routed};
pub use app::App;
pub use error::ApiError;
pub use response::HttpResponse;
pub use router::{normalize_path, Handler, RouteMatch, Router};
