//! OpenAPI definition handler.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use features_protocol::media_types;

use crate::state::AppState;

/// OpenAPI 3.0 document; `{{API_URL}}` is replaced by the served API root.
const DEFINITION: &str = include_str!("../../openapi.json");

/// GET {api}/definition
pub async fn definition_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    crate::metrics::record_request("definition");
    let body = DEFINITION.replace("{{API_URL}}", &state.base_url);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_types::OPENAPI_JSON),
            (header::CACHE_CONTROL, "max-age=3600"),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_is_valid_json() {
        let body = DEFINITION.replace("{{API_URL}}", "http://localhost:8081/api");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["servers"][0]["url"], "http://localhost:8081/api");
        assert!(value["paths"]["/collections/{collectionId}/items"].is_object());
    }
}
