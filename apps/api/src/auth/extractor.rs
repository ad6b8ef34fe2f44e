use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::auth::session::{bearer_token, decode_token};
use crate::errors::AppError;
use crate::models::user::UserRole;
use crate::state::AppState;

/// The caller behind a valid, unrevoked bearer token. The role is read
/// from the live employee record, not from the token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.is_administrator() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Any employee role; applicants are read-only.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role == UserRole::Applicant {
            Err(AppError::Forbidden)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
        let token = bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))?;

        let claims = decode_token(token, &state.session_keys)
            .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        if state.sessions.is_revoked(claims.sid).await {
            return Err(AppError::Unauthorized("Session has been logged out".to_string()));
        }

        let user = state
            .accounts
            .active_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;

        Ok(CurrentUser {
            user_id: user.id,
            role: user.role,
        })
    }
}
