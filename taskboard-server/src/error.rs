//! Errors returned by workflow operations and their HTTP rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskboard_proto::api::ErrorBody;
use taskboard_proto::change_request::AlreadyResolved;
use taskboard_proto::task::TaskPatchError;

use crate::store::StoreError;

/// Failure of a request-scoped operation.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No caller identity, or one the store does not know.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A referenced record does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// The caller lacks the role the operation needs.
    #[error("{0}")]
    Forbidden(String),

    /// The record is not in a state that allows the operation.
    #[error("{0}")]
    InvalidState(String),

    /// The request body was rejected.
    #[error("{0}")]
    Validation(String),

    /// The store failed. Details are logged, not returned.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}

impl From<TaskPatchError> for AppError {
    fn from(e: TaskPatchError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<AlreadyResolved> for AppError {
    fn from(e: AlreadyResolved) -> Self {
        Self::InvalidState(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            Self::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
