//! HTTP request handlers for the Features API.

pub mod api;
pub mod collections;
pub mod conformance;
pub mod health;
pub mod items;
pub mod landing;

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Path parameters shared by plain and context-scoped routes.
#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub context: Option<String>,
    pub collection_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemPath {
    pub context: Option<String>,
    pub collection_id: String,
    pub feature_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ContextPath {
    pub context: Option<String>,
}

/// JSON body with an explicit media type.
pub(crate) fn json_response<T: Serialize>(value: &T, content_type: &'static str) -> Response {
    ([(header::CONTENT_TYPE, content_type)], Json(value)).into_response()
}
