use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use super::code::CodeError;
use super::store::StoreError;

/// Stable, client-facing error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    FailedPrecondition,
    ResourceExhausted,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::FailedPrecondition => "failed-precondition",
            ErrorKind::ResourceExhausted => "resource-exhausted",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

#[derive(Error, Debug)]
pub enum PairingError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Invite not found")]
    NotFound,
    #[error("Invite has already been used")]
    AlreadyUsed,
    #[error("Couple is already paired")]
    CoupleFull,
    #[error("Not a member of this couple")]
    PermissionDenied,
    #[error("Already paired with someone else")]
    AlreadyPaired,
    #[error("Corrupted pairing record: {0}")]
    FailedPrecondition(String),
    #[error("No free invite code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
}

impl PairingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PairingError::Unauthenticated => ErrorKind::Unauthenticated,
            PairingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PairingError::NotFound => ErrorKind::NotFound,
            PairingError::AlreadyUsed | PairingError::CoupleFull => ErrorKind::AlreadyExists,
            PairingError::PermissionDenied => ErrorKind::PermissionDenied,
            PairingError::FailedPrecondition(_) | PairingError::AlreadyPaired => {
                ErrorKind::FailedPrecondition
            }
            PairingError::GenerationExhausted { .. } => ErrorKind::ResourceExhausted,
            PairingError::StorageUnavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Safe to repeat the whole call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PairingError::StorageUnavailable(_) | PairingError::GenerationExhausted { .. }
        )
    }

    /// Text for the end user. Code problems ask to check the code, the rest to retry.
    pub fn user_message(&self) -> &'static str {
        match self {
            PairingError::AlreadyUsed | PairingError::CoupleFull => {
                "Someone already joined with this code, check the code"
            }
            PairingError::NotFound | PairingError::InvalidArgument(_) => {
                "This code doesn't work, check the code"
            }
            PairingError::Unauthenticated => "Please sign in again",
            PairingError::AlreadyPaired => "You are already paired",
            _ => "Something went wrong, try again",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PairingError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PairingError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            PairingError::NotFound => StatusCode::NOT_FOUND,
            PairingError::AlreadyUsed | PairingError::CoupleFull => StatusCode::CONFLICT,
            PairingError::PermissionDenied => StatusCode::FORBIDDEN,
            PairingError::FailedPrecondition(_) | PairingError::AlreadyPaired => {
                StatusCode::PRECONDITION_FAILED
            }
            PairingError::GenerationExhausted { .. } | PairingError::StorageUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl From<CodeError> for PairingError {
    fn from(e: CodeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<JsonRejection> for PairingError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidArgument(e.body_text())
    }
}

impl From<validator::ValidationErrors> for PairingError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl IntoResponse for PairingError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();

        match &self {
            PairingError::FailedPrecondition(detail) => {
                tracing::error!("Pairing data corruption: {detail}");
            }
            PairingError::StorageUnavailable(e) => {
                tracing::error!("Internal server error: {e:?}");
            }
            PairingError::GenerationExhausted { attempts } => {
                tracing::error!("Invite code space exhausted after {attempts} attempts");
            }
            _ => (),
        }

        let info = match self {
            PairingError::FailedPrecondition(_)
            | PairingError::StorageUnavailable(_)
            | PairingError::GenerationExhausted { .. } => self.user_message().to_string(),
            _ => self.to_string(),
        };

        (
            status_code,
            Json(json!({ "kind": self.kind().as_str(), "error_info": info })),
        )
            .into_response()
    }
}
