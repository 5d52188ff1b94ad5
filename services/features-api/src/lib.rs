//! Features API Service Library
//!
//! HTTP server exposing backend data services through the OGC API -
//! Features interface. Query translation lives in `features-query`;
//! this crate wires configuration, the layer catalog, backend targets and
//! collection resolution behind an axum router.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod metrics;
pub mod remote;
pub mod resolver;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the application router.
///
/// Collection routes are served both at the API root and under
/// `{api}/contexts/:context` for catalog-scoped resolution.
pub fn router(state: Arc<AppState>) -> Router {
    let api = state.config.api_path.trim_end_matches('/').to_string();

    let mut app = Router::new().route(&format!("{}/", api), get(handlers::landing::landing_handler));
    if !api.is_empty() {
        app = app.route(&api, get(handlers::landing::landing_handler));
    }

    app = app
        .route(&format!("{}/conformance", api), get(handlers::conformance::conformance_handler))
        .route(&format!("{}/definition", api), get(handlers::api::definition_handler))
        .route(&format!("{}/healthcheck", api), get(handlers::health::healthcheck_handler))
        .route("/metrics", get(handlers::health::metrics_handler));

    for prefix in [api.clone(), format!("{}/contexts/:context", api)] {
        app = app
            .route(
                &format!("{}/collections", prefix),
                get(handlers::collections::collections_handler),
            )
            .route(
                &format!("{}/collections/:collection_id", prefix),
                get(handlers::collections::collection_handler),
            )
            .route(
                &format!("{}/collections/:collection_id/items", prefix),
                get(handlers::items::items_handler).post(handlers::items::post_items_handler),
            )
            .route(
                &format!("{}/collections/:collection_id/items/:feature_id", prefix),
                get(handlers::items::item_handler),
            );
    }

    app.layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
