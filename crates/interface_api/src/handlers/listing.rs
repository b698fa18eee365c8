//! Listing handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use domain_gop::ListingParams;
use domain_party::Actor;

use crate::dto::gop::{IndexResponse, ListingResponse};
use crate::{error::ApiError, AppState};

/// Summary counts of the caller's open requests
pub async fn index(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<IndexResponse>, ApiError> {
    Ok(Json(state.service.counts(&actor).await?.into()))
}

/// Open requests, filtered and paginated
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    Ok(Json(state.service.list(&actor, params).await?.into()))
}

/// Free-text search over open requests (`?query=`)
pub async fn search(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    Ok(Json(state.service.list(&actor, params).await?.into()))
}

/// Closed requests
pub async fn history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    Ok(Json(state.service.history(&actor, params).await?.into()))
}

/// Admin listing by country and company
pub async fn filter(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    Ok(Json(state.service.filter(&actor, params).await?.into()))
}
