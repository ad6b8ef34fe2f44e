use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::accounts::find_account_by_email;
use crate::auth::extractor::CurrentUser;
use crate::auth::password::verify_password;
use crate::auth::session::{bearer_token, decode_token, issue_token};
use crate::envelope::ApiResponse;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let account = find_account_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &account.password_hash) {
        warn!("Failed login attempt for {}", account.email);
        return Err(invalid());
    }

    let user = account.into_user();
    let (token, claims) = issue_token(user.id, user.role, &state.session_keys)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to issue session token: {e}")))?;
    let expires_at = Utc
        .timestamp_opt(claims.exp as i64, 0)
        .single()
        .unwrap_or_else(Utc::now);

    info!("User {} logged in as {}", user.email, user.role.as_str());

    Ok(Json(ApiResponse::with_message(
        LoginData {
            token,
            expires_at,
            user,
        },
        "Login successful",
    )))
}

/// POST /api/v1/auth/logout
///
/// Always succeeds so clients can drop local state; a valid token is revoked.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<ApiResponse<()>> {
    let claims = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| decode_token(token, &state.session_keys).ok());

    if let Some(claims) = claims {
        state.sessions.revoke(&claims).await;
        info!("Session {} for user {} logged out", claims.sid, claims.sub);
    }

    Json(ApiResponse::message_only("Logged out"))
}

/// GET /api/v1/auth/me
///
/// Re-validates the session against the employee record.
pub async fn handle_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state
        .accounts
        .active_user(current.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;
    Ok(Json(ApiResponse::ok(user)))
}
