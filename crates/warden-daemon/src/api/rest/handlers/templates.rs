//! Policy template lifecycle

use super::LifecycleResponse;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use warden_types::PolicyTemplate;

/// Get a registered policy template
pub async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PolicyTemplate>> {
    state
        .client
        .template(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Template {} not found", name)))
}

/// Compile and register a policy template with every driver
pub async fn upsert_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(template): Json<PolicyTemplate>,
) -> ApiResult<Json<LifecycleResponse>> {
    if template.name() != name {
        return Err(ApiError::BadRequest(format!(
            "template name {:?} does not match path {:?}",
            template.name(),
            name
        )));
    }
    state.client.add_template(&template).await?;

    tracing::info!(template = %name, kind = %template.kind(), "Upserted policy template");
    Ok(Json(LifecycleResponse::applied(name)))
}

/// Unregister a policy template and every constraint of its kind
pub async fn delete_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LifecycleResponse>> {
    let template = state
        .client
        .template(&name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Template {} not found", name)))?;
    state.client.remove_template(&template).await?;

    tracing::info!(template = %name, "Removed policy template");
    Ok(Json(LifecycleResponse::removed(name)))
}
