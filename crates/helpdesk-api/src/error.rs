use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use helpdesk_db::users::UserConflict;
use helpdesk_types::api::ValidationError;

use crate::triage::TriageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or out-of-range input, rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Triage service unavailable: {0}")]
    Upstream(#[from] TriageError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<UserConflict> for ApiError {
    fn from(conflict: UserConflict) -> Self {
        match conflict {
            UserConflict::Username => Self::Conflict("Username already exists"),
            UserConflict::Email => Self::Conflict("Email already exists"),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.0)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            Self::Upstream(e) => {
                warn!("Upstream failure: {}", e);
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
