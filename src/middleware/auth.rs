// Bearer-token guard for user-facing endpoints
// Disabled when no JWT secret is configured (local development).

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::services::jwt::AuthenticatedUser;
use crate::utils::purchase_errors::PurchaseError;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    Disabled,
    User(AuthenticatedUser),
}

impl AuthContext {
    /// The caller may only act on its own user id
    pub fn authorize(&self, user_id: Uuid) -> Result<(), PurchaseError> {
        match self {
            AuthContext::Disabled => Ok(()),
            AuthContext::User(user) if user.user_id == user_id => Ok(()),
            AuthContext::User(user) => {
                warn!(token_user = %user.user_id, requested_user = %user_id, "User id mismatch");
                Err(PurchaseError::Forbidden)
            },
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = PurchaseError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(verifier) = state.jwt_verifier.as_ref() else {
            return Ok(AuthContext::Disabled);
        };

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(PurchaseError::Unauthorized)?;

        verifier.verify(token).map(AuthContext::User).map_err(|e| {
            warn!("JWT validation failed: {}", e);
            PurchaseError::Unauthorized
        })
    }
}
