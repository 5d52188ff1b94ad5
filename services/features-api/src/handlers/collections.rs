//! Collection listing and description handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use features_protocol::{Collection, CollectionList};

use super::{CollectionPath, ContextPath};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET {api}/collections and {api}/contexts/:context/collections
pub async fn collections_handler(
    Extension(state): Extension<Arc<AppState>>,
    path: Option<Path<ContextPath>>,
) -> ApiResult<Json<CollectionList>> {
    crate::metrics::record_request("collections");
    let context = path.and_then(|Path(p)| p.context);
    let base_url = state.context_url(context.as_deref());

    let collections = state
        .resolver
        .list_collections(&base_url, context.as_deref())
        .await?;
    Ok(Json(CollectionList::new(collections, &base_url)))
}

/// GET {api}/collections/:collection_id
pub async fn collection_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<CollectionPath>,
) -> ApiResult<Json<Collection>> {
    crate::metrics::record_request("collection");
    let context = path.context.as_deref();
    let collection = state
        .resolver
        .describe(&path.collection_id, &state.context_url(context), context)
        .await?;
    Ok(Json(collection))
}
