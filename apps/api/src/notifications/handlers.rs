use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{require_text, ApiResponse};
use crate::errors::AppError;
use crate::notifications::mailer::{validate_email_message, EmailMessage, EmailReceipt};
use crate::notifications::store::{NewNotification, Notification};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct Affected {
    pub affected: usize,
}

/// GET /api/v1/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<ApiResponse<NotificationList>> {
    let notifications = state.notifications.list(user.user_id).await;
    let unread_count = state.notifications.unread_count(user.user_id).await;
    Json(ApiResponse::ok(NotificationList {
        notifications,
        unread_count,
    }))
}

/// POST /api/v1/notifications
pub async fn handle_add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut req): Json<NewNotification>,
) -> Result<(StatusCode, Json<ApiResponse<Notification>>), AppError> {
    req.title = require_text("title", &req.title)?;
    let created = state.notifications.add(user.user_id, req).await;
    info!("Notification '{}' added for user {}", created.title, user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(created, "Notification added")),
    ))
}

/// PATCH /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let updated = state
        .notifications
        .mark_read(user.user_id, id)
        .await
        .ok_or_else(|| AppError::not_found("Notification", id))?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<ApiResponse<Affected>> {
    let affected = state.notifications.mark_all_read(user.user_id).await;
    Json(ApiResponse::with_message(
        Affected { affected },
        "All notifications marked as read",
    ))
}

/// DELETE /api/v1/notifications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if !state.notifications.delete(user.user_id, id).await {
        return Err(AppError::not_found("Notification", id));
    }
    Ok(Json(ApiResponse::message_only("Notification deleted")))
}

/// DELETE /api/v1/notifications
pub async fn handle_clear(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<ApiResponse<Affected>> {
    let affected = state.notifications.clear(user.user_id).await;
    info!("Cleared {affected} notifications for user {}", user.user_id);
    Json(ApiResponse::with_message(
        Affected { affected },
        "All notifications cleared",
    ))
}

/// POST /api/v1/notifications/email
pub async fn handle_send_email(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(message): Json<EmailMessage>,
) -> Result<Json<ApiResponse<EmailReceipt>>, AppError> {
    validate_email_message(&message)?;
    let receipt = state.mailer.send(&message).await?;
    Ok(Json(ApiResponse::with_message(
        receipt,
        format!("Email sent to {}", message.to),
    )))
}
