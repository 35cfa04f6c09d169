//! Health and dump handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub serving_threads: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        serving_threads: state.handler.gate().limit(),
    })
}

/// Registered policy state of every driver plus the expansion templates
pub async fn dump(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let policy = state.client.dump().await?;
    let expansions: Vec<String> = state
        .expansion
        .templates()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    Ok(Json(json!({
        "policy": policy,
        "expansions": expansions,
        "namespaces": state.namespaces.len(),
    })))
}
