//! Items handlers: the query pipeline from request to feature collection.
//!
//! resolve collection -> translate parameters -> apply pagination ->
//! backend find -> project results.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    response::Response,
};
use chrono::Utc;
use features_protocol::{media_types, FeaturesError};
use features_query::{
    build_links, compute_effective, CqlTranslator, PaginationPolicy, QueryParameters, QueryTranslator,
    ResultProjector, TranslationOptions,
};
use serde_json::Value;
use tracing::debug;

use super::{json_response, CollectionPath, ItemPath};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET {api}/collections/:collection_id/items
pub async fn items_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<CollectionPath>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    crate::metrics::record_request("items");
    query_items(&state, &path, QueryParameters::new(params), None)
        .await
        .map_err(|e| failed("items", e))
}

/// POST {api}/collections/:collection_id/items with a CQL-JSON body
pub async fn post_items_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<CollectionPath>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> ApiResult<Response> {
    crate::metrics::record_request("items");
    let body = parse_body(&body).map_err(|e| failed("items", e))?;
    query_items(&state, &path, QueryParameters::new(params), body)
        .await
        .map_err(|e| failed("items", e))
}

/// GET {api}/collections/:collection_id/items/:feature_id
pub async fn item_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<ItemPath>,
) -> ApiResult<Response> {
    crate::metrics::record_request("item");
    get_item(&state, &path).await.map_err(|e| failed("item", e))
}

fn failed(endpoint: &'static str, error: FeaturesError) -> ApiError {
    crate::metrics::record_failure(endpoint, error.status_code());
    ApiError(error)
}

/// Empty bodies carry no filter.
fn parse_body(body: &[u8]) -> Result<Option<Value>, FeaturesError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|_| FeaturesError::bad_request("Invalid request body, a CQL JSON expression is expected"))
}

async fn query_items(
    state: &AppState,
    path: &CollectionPath,
    params: QueryParameters,
    body: Option<Value>,
) -> Result<Response, FeaturesError> {
    let started = Instant::now();
    let context = path.context.as_deref();
    let resolved = state.resolver.resolve(&path.collection_id, context).await?;
    let descriptor = resolved.descriptor();
    let now = Utc::now();

    let options = TranslationOptions::new(descriptor.is_features())
        .with_reserved(state.config.reserved_query_parameters.clone())
        .with_now(now);
    let mut query = QueryTranslator::new(options, &state.crs)
        .with_bound_filter(resolved.bound_filter.as_ref())
        .with_body(body.as_ref())
        .translate(&params)?;

    let policy = PaginationPolicy::new(&state.config.pagination, &descriptor.pagination);
    let page = compute_effective(query.limit, query.skip, &policy);
    query.limit = Some(page.limit);
    query.skip = Some(page.offset);

    let result = resolved.target.find(&query).await?;

    let base_url = state.context_url(context);
    let id = resolved.id();
    let links = build_links(&base_url, &id, &params, page, result.records.len() as u64, result.total);
    let envelope = ResultProjector::new(&base_url, &id).project(result, links, now);

    debug!(
        collection = %id,
        matched = envelope.number_matched,
        returned = envelope.number_returned,
        "Served items"
    );
    crate::metrics::record_items(envelope.number_returned, started.elapsed().as_secs_f64() * 1000.0);
    Ok(json_response(&envelope, media_types::GEO_JSON))
}

async fn get_item(state: &AppState, path: &ItemPath) -> Result<Response, FeaturesError> {
    let context = path.context.as_deref();
    let resolved = state.resolver.resolve(&path.collection_id, context).await?;

    let namespace = TranslationOptions::new(resolved.descriptor().is_features()).namespace;
    let bound = resolved
        .bound_filter
        .as_ref()
        .map(|filter| CqlTranslator::new(namespace, Utc::now()).translate_json(filter))
        .transpose()?;

    let record = resolved.target.get(&path.feature_id, bound.as_ref()).await?;
    let feature = ResultProjector::new(state.context_url(context), resolved.id()).project_feature(record);
    Ok(json_response(&feature, media_types::GEO_JSON))
}
