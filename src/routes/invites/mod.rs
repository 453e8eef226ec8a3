pub mod models;

use crate::modules::AppState;
use crate::routes::invites::models::{CreateInvite, RedeemInvite, RedeemResult};
use crate::utils::auth::models::Claims;
use crate::utils::pairing::errors::PairingError;
use crate::utils::pairing::models::{InvitePreview, IssuedInvite};
use crate::utils::pairing::store::PairingStore;
use crate::utils::pairing::{issue_invite, preview_invite, redeem_invite};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{debug_handler, Json, Router};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invitation))
        .route("/redeem", post(redeem_invitation))
        .route("/:code", get(preview_invitation))
}

/// Issue an invite for the caller's couple
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/invites", tag = "invites", request_body = CreateInvite, responses((status = 200, description = "Issued invite", body = IssuedInvite), (status = 401, description = "Missing or invalid token"), (status = 409, description = "Couple already paired")))]
pub async fn create_invitation(
    claims: Option<Claims>,
    State(state): State<AppState>,
    body: Result<Json<CreateInvite>, JsonRejection>,
) -> Result<Json<IssuedInvite>, PairingError> {
    let caller = claims.ok_or(PairingError::Unauthenticated)?.uid;
    let Json(body) = body?;
    body.validate()?;

    let issued = issue_invite(
        state.store.as_ref(),
        state.codes.as_ref(),
        &state.links,
        Some(caller),
        body.owner_name.trim(),
        body.owner_avatar.as_deref(),
        body.preferred_code.as_deref(),
    )
    .await?;

    debug!("Invite {} shared by {caller}", issued.code);
    Ok(Json(issued))
}

/// Redeem an invite code
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/invites/redeem", tag = "invites", request_body = RedeemInvite, responses((status = 200, description = "Joined the couple", body = RedeemResult), (status = 400, description = "Malformed code or body"), (status = 401, description = "Missing or invalid token"), (status = 404, description = "Unknown code"), (status = 409, description = "Code already used"), (status = 412, description = "Caller already paired")))]
pub async fn redeem_invitation(
    claims: Option<Claims>,
    State(store): State<Arc<dyn PairingStore>>,
    body: Result<Json<RedeemInvite>, JsonRejection>,
) -> Result<Json<RedeemResult>, PairingError> {
    let caller = claims.ok_or(PairingError::Unauthenticated)?.uid;
    let Json(body) = body?;
    let redemption = redeem_invite(store.as_ref(), Some(caller), body.code.as_deref()).await?;

    Ok(Json(RedeemResult {
        success: true,
        couple_id: redemption.couple_id,
    }))
}

/// Show who sent an invite
#[debug_handler(state = AppState)]
#[utoipa::path(get, path = "/invites/{code}", tag = "invites", params(("code" = String, Path, description = "Invite code")), responses((status = 200, description = "Invite owner", body = InvitePreview), (status = 404, description = "Unknown code"), (status = 409, description = "Code already used")))]
pub async fn preview_invitation(
    State(store): State<Arc<dyn PairingStore>>,
    Path(code): Path<String>,
) -> Result<Json<InvitePreview>, PairingError> {
    Ok(Json(preview_invite(store.as_ref(), &code).await?))
}
