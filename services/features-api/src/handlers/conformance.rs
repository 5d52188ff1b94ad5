//! Conformance declaration handler.

use axum::Json;
use features_protocol::ConformanceClasses;

/// GET {api}/conformance
pub async fn conformance_handler() -> Json<ConformanceClasses> {
    crate::metrics::record_request("conformance");
    Json(ConformanceClasses::current())
}
