//! Landing page handler.

use std::sync::Arc;

use axum::{extract::Extension, response::Response};
use features_protocol::{media_types, LandingPage};

use super::json_response;
use crate::state::AppState;

/// GET {api} - Landing page
pub async fn landing_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    crate::metrics::record_request("landing");
    let landing = LandingPage::new(&state.config.title, &state.config.description, &state.base_url);
    json_response(&landing, media_types::JSON)
}
