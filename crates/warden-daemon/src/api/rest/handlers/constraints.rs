//! Constraint lifecycle

use super::LifecycleResponse;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use warden_types::{Constraint, CONSTRAINTS_GROUP};

/// Validate and bind a constraint
pub async fn upsert_constraint(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<Json<LifecycleResponse>> {
    let constraint =
        Constraint::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !constraint.kind().eq_ignore_ascii_case(&kind) || constraint.name() != name {
        return Err(ApiError::BadRequest(format!(
            "constraint {}/{} does not match path {}/{}",
            constraint.kind(),
            constraint.name(),
            kind,
            name
        )));
    }
    state.client.add_constraint(&constraint).await?;

    tracing::info!(kind = %constraint.kind(), constraint = %name, "Upserted constraint");
    Ok(Json(LifecycleResponse::applied(name)))
}

/// Unbind a constraint; absent constraints are not an error
pub async fn delete_constraint(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Json<LifecycleResponse>> {
    let constraint = Constraint::from_value(json!({
        "apiVersion": format!("{CONSTRAINTS_GROUP}/v1beta1"),
        "kind": kind,
        "metadata": {"name": name},
    }))
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.client.remove_constraint(&constraint).await?;

    tracing::info!(kind = %kind, constraint = %name, "Removed constraint");
    Ok(Json(LifecycleResponse::removed(name)))
}
