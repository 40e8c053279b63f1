//! Caller identity.
//!
//! An upstream session layer authenticates the user and forwards the user id
//! in the [`USER_ID_HEADER`] header. The id is resolved against the store on
//! every request.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use taskboard_proto::api::UserSummary;
use taskboard_proto::ids::UserId;

use crate::error::AppError;
use crate::server::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(UserSummary);

impl std::ops::Deref for Principal {
    type Target = UserSummary;

    fn deref(&self) -> &UserSummary {
        &self.0
    }
}

impl From<UserSummary> for Principal {
    fn from(user: UserSummary) -> Self {
        Self(user)
    }
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(user_id) = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
        else {
            return Err(AppError::Unauthenticated);
        };

        match state.store.get_user(user_id).await? {
            Some(user) => Ok(Self::from(user)),
            None => {
                tracing::warn!(user_id = %user_id, "request from unknown user");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
