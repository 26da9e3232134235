//! Item listing and creation.

use crate::http::response::{json, DataBody, HttpResponse};
use crate::http::ApiError;
use crate::metrics::ItemOperation;
use crate::state::AppState;
use bytes::Bytes;
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::{Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// An item returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
}

/// The fixed catalogue served by `GET /api/items`.
pub fn fixed_items() -> Vec<Item> {
    [
        (1, "Alpha", ItemStatus::Active),
        (2, "Beta", ItemStatus::Active),
        (3, "Gamma", ItemStatus::Inactive),
    ]
    .into_iter()
    .map(|(id, name, status)| Item {
        id,
        name: name.to_string(),
        status,
    })
    .collect()
}

/// `GET /api/items`
pub fn list_items(state: &AppState, _req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    let items = fixed_items();
    state.metrics().business().record_item(ItemOperation::Read);
    info!(count = items.len(), "items fetched");

    Ok(json(StatusCode::OK, &DataBody::success(items)))
}

/// `POST /api/items`
pub fn create_item(state: &AppState, req: &Request<Bytes>) -> Result<HttpResponse, ApiError> {
    let name = requested_name(req)?.ok_or_else(|| ApiError::bad_request("Name required"))?;

    let item = Item {
        id: state.next_item_id(),
        name,
        status: ItemStatus::Active,
    };
    state.metrics().business().record_item(ItemOperation::Create);
    info!(id = item.id, name = %item.name, "item created");

    Ok(json(StatusCode::CREATED, &DataBody::success(item)))
}

/// Extract a non-empty string `name` from a JSON body.
///
/// Bodies without a JSON content type read as an empty object.
fn requested_name(req: &Request<Bytes>) -> Result<Option<String>, ApiError> {
    if !is_json(req.headers()) || req.body().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(req.body())
        .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;

    Ok(value
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime.to_ascii_lowercase().ends_with("+json")
}
