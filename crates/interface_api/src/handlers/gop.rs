//! GOP request handlers
//!
//! The legacy clients call `resend` and `close` with GET; those routes keep
//! that shape, so repeating the call repeats the side effects.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{ClaimId, GopId};
use domain_gop::{Claim, DecisionInput, GopDetails, GopDraft, GopError, GuaranteeOfPayment, TerminalClaimRequest};
use domain_party::Actor;

use crate::dto::gop::{BulkItemResult, EditRequest, StampAuthorRequest};
use crate::{error::ApiError, AppState};

/// Ids that do not parse are missing requests, not malformed calls
fn path_id(entity: &'static str, raw: &str) -> Result<i64, GopError> {
    raw.parse().map_err(|_| GopError::not_found(entity, raw))
}

fn gop_id(raw: &str) -> Result<GopId, GopError> {
    path_id("GuaranteeOfPayment", raw).map(GopId::new)
}

/// Submits a request
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<GopDraft>,
) -> Result<(StatusCode, Json<GuaranteeOfPayment>), ApiError> {
    let gop = state.service.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(gop)))
}

/// Submits several requests; each draft reports its own outcome
pub async fn create_bulk(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(drafts): Json<Vec<GopDraft>>,
) -> Json<Vec<BulkItemResult>> {
    let results = state.service.create_many(&actor, drafts).await;
    Json(
        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| BulkItemResult::new(index, result))
            .collect(),
    )
}

/// Detail view; the payer's first view starts the review
pub async fn view(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<GopDetails>, ApiError> {
    Ok(Json(state.service.view(&actor, gop_id(&id)?).await?))
}

pub async fn admin_view(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<GopDetails>, ApiError> {
    Ok(Json(state.service.admin_view(&actor, gop_id(&id)?).await?))
}

/// Payer decision, from the detail form or the API
pub async fn decide(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(input): Json<DecisionInput>,
) -> Result<Json<GuaranteeOfPayment>, ApiError> {
    Ok(Json(state.service.decide(&actor, gop_id(&id)?, input).await?))
}

pub async fn set_stamp_author(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<StampAuthorRequest>,
) -> Result<Json<GuaranteeOfPayment>, ApiError> {
    let gop = state
        .service
        .set_stamp_author(&actor, gop_id(&id)?, &body.stamp_author)
        .await?;
    Ok(Json(gop))
}

/// Provider edit, from the edit form or the API
pub async fn edit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<EditRequest>,
) -> Result<Json<GuaranteeOfPayment>, ApiError> {
    let gop = state
        .service
        .edit(&actor, gop_id(&id)?, body.patch, body.mark_final)
        .await?;
    Ok(Json(gop))
}

pub async fn resend(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<GuaranteeOfPayment>, ApiError> {
    Ok(Json(state.service.resend(&actor, gop_id(&id)?).await?))
}

pub async fn close(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, reason)): Path<(String, String)>,
) -> Result<Json<GuaranteeOfPayment>, ApiError> {
    Ok(Json(state.service.close(&actor, gop_id(&id)?, &reason).await?))
}

/// Claim shell reported by a provider terminal
pub async fn open_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<TerminalClaimRequest>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let claim = state.service.open_terminal_claim(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// Completes a request from a claim shell
pub async fn create_from_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(claim_id): Path<String>,
    Json(draft): Json<GopDraft>,
) -> Result<(StatusCode, Json<GuaranteeOfPayment>), ApiError> {
    let gop = state
        .service
        .create_from_claim(&actor, ClaimId::new(path_id("Claim", &claim_id)?), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(gop)))
}
