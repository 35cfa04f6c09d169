//! Expansion template lifecycle

use super::LifecycleResponse;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use warden_expansion::validate_template;
use warden_types::ExpansionTemplate;

/// List stored expansion templates, ordered by name
pub async fn list_expansions(State(state): State<AppState>) -> Json<Vec<ExpansionTemplate>> {
    Json(
        state
            .expansion
            .templates()
            .iter()
            .map(|t| t.as_ref().clone())
            .collect(),
    )
}

/// Create or replace an expansion template
pub async fn upsert_expansion(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(mut template): Json<ExpansionTemplate>,
) -> ApiResult<Json<LifecycleResponse>> {
    if template.name().is_empty() {
        template.metadata.name = name.clone();
    } else if template.name() != name {
        return Err(ApiError::BadRequest(format!(
            "template name {:?} does not match path {:?}",
            template.name(),
            name
        )));
    }

    // Unusable templates are stored and surface as errors when they apply.
    if let Err(e) = validate_template(&template) {
        tracing::warn!(template = %name, error = %e, "Stored unusable expansion template");
    }
    state.expansion.upsert_template(&template)?;

    tracing::info!(template = %name, "Upserted expansion template");
    Ok(Json(LifecycleResponse::applied(name)))
}

/// Remove an expansion template; absent templates are not an error
pub async fn delete_expansion(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LifecycleResponse>> {
    state.expansion.remove_template_by_name(&name)?;
    tracing::info!(template = %name, "Removed expansion template");
    Ok(Json(LifecycleResponse::removed(name)))
}
