use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Unexpected(e) => {
                tracing::error!("Internal server error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let kind = match &self {
            AuthError::InvalidToken => "unauthenticated",
            AuthError::Unexpected(_) => "unavailable",
        };

        let info = match self {
            AuthError::Unexpected(_) => "Unexpected server error".to_string(),
            _ => self.to_string(),
        };

        (
            status_code,
            Json(json!({ "kind": kind, "error_info": info })),
        )
            .into_response()
    }
}
