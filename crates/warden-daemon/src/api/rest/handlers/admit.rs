//! Admission decision endpoint

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, Json};
use warden_types::AdmissionReview;
use warden_webhook::Cancellation;

/// Decide one admission review.
///
/// A request still waiting for a serving slot when the daemon begins shutting
/// down is aborted.
pub async fn admit(
    State(state): State<AppState>,
    Json(review): Json<AdmissionReview>,
) -> ApiResult<Json<AdmissionReview>> {
    let request = review
        .request
        .clone()
        .ok_or_else(|| ApiError::BadRequest("admission review carries no request".to_string()))?;

    let cancel = Cancellation::from_watch(state.shutdown_rx.clone());
    let response = state.handler.handle(request, &cancel).await;

    tracing::debug!(
        uid = %response.uid,
        allowed = response.allowed,
        code = response.code(),
        "Admission decided"
    );
    Ok(Json(review.respond(response)))
}
