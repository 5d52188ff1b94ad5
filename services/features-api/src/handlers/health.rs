//! Healthcheck and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use features_protocol::HealthStatus;

use crate::state::AppState;

/// GET {api}/healthcheck
pub async fn healthcheck_handler() -> Json<HealthStatus> {
    Json(health_status(|key| std::env::var(key).ok()))
}

/// `VERSION` overrides the package version; `BUILD_NUMBER` is reported when set.
fn health_status(lookup: impl Fn(&str) -> Option<String>) -> HealthStatus {
    let version = lookup("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    HealthStatus::new(env!("CARGO_PKG_NAME"), version)
        .with_build_number(lookup("BUILD_NUMBER").filter(|b| !b.is_empty()))
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
