use crate::utils::auth::errors::AuthError;
use crate::utils::pairing::errors::PairingError;
use axum::response::IntoResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error(transparent)]
    PairingError(#[from] PairingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::AuthError(e) => e.into_response(),
            AppError::PairingError(e) => e.into_response(),
        }
    }
}
