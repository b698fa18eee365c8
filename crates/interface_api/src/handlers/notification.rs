//! Notification polling

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use domain_party::Actor;

use crate::{error::ApiError, AppState};

/// Returns and deletes the caller's oldest notification; `204` when none is queued
pub async fn check_notification(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Response, ApiError> {
    let response = match state.service.check_notification(&actor).await? {
        Some(notification) => Json(notification).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}
