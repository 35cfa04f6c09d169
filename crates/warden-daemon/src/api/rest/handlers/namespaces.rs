//! Namespace cache sync

use super::LifecycleResponse;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use warden_types::Namespace;

/// Cache a namespace object
pub async fn upsert_namespace(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(mut namespace): Json<Namespace>,
) -> ApiResult<Json<LifecycleResponse>> {
    if namespace.name().is_empty() {
        namespace.metadata.name = name.clone();
    } else if namespace.name() != name {
        return Err(ApiError::BadRequest(format!(
            "namespace name {:?} does not match path {:?}",
            namespace.name(),
            name
        )));
    }
    state.namespaces.upsert(namespace);
    tracing::debug!(namespace = %name, "Cached namespace");
    Ok(Json(LifecycleResponse::applied(name)))
}

/// Drop a cached namespace
pub async fn delete_namespace(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LifecycleResponse>> {
    state
        .namespaces
        .remove(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Namespace {} not found", name)))?;
    tracing::debug!(namespace = %name, "Evicted namespace");
    Ok(Json(LifecycleResponse::removed(name)))
}
