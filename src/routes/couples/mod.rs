use crate::app_errors::AppError;
use crate::modules::AppState;
use crate::utils::auth::models::Claims;
use crate::utils::pairing::models::Couple;
use crate::utils::pairing::store::PairingStore;
use crate::utils::pairing::{create_couple, fetch_couple};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{debug_handler, Json, Router};
use std::sync::Arc;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(post_couple))
        .route("/me", get(get_own_couple))
}

/// Start a couple owned by the caller
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/couples", tag = "couples", responses((status = 200, description = "Caller's couple", body = Couple), (status = 401, description = "Missing or invalid token")))]
pub async fn post_couple(
    claims: Claims,
    State(store): State<Arc<dyn PairingStore>>,
) -> Result<Json<Couple>, AppError> {
    Ok(Json(create_couple(store.as_ref(), claims.uid).await?))
}

/// Fetch the caller's couple
#[debug_handler(state = AppState)]
#[utoipa::path(get, path = "/couples/me", tag = "couples", responses((status = 200, description = "Caller's couple", body = Couple), (status = 404, description = "Caller is not in a couple")))]
pub async fn get_own_couple(
    claims: Claims,
    State(store): State<Arc<dyn PairingStore>>,
) -> Result<Json<Couple>, AppError> {
    Ok(Json(fetch_couple(store.as_ref(), claims.uid).await?))
}
