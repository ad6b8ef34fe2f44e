use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{require_text, ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::models::org::LeaveTypeRow;
use crate::org::guards::ensure_leave_type_deletable;
use crate::state::AppState;

/// A year's worth of leave; anything above is a data-entry mistake.
const MAX_DAYS_PER_YEAR: i32 = 366;

#[derive(Debug, Deserialize)]
pub struct CreateLeaveType {
    pub name: String,
    pub description: Option<String>,
    pub days_per_year: i32,
    #[serde(default = "default_paid")]
    pub is_paid: bool,
}

fn default_paid() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeaveType {
    pub name: Option<String>,
    pub description: Option<String>,
    pub days_per_year: Option<i32>,
    pub is_paid: Option<bool>,
    pub is_active: Option<bool>,
}

fn validate_days(days: i32) -> Result<i32, AppError> {
    if !(0..=MAX_DAYS_PER_YEAR).contains(&days) {
        return Err(AppError::Validation(format!(
            "days_per_year must be between 0 and {MAX_DAYS_PER_YEAR}"
        )));
    }
    Ok(days)
}

async fn fetch_leave_type(pool: &PgPool, id: Uuid) -> Result<LeaveTypeRow, AppError> {
    sqlx::query_as::<_, LeaveTypeRow>("SELECT * FROM leave_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Leave type", id))
}

/// GET /api/v1/leave-types
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<LeaveTypeRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "name ILIKE $1 OR COALESCE(description, '') ILIKE $1";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM leave_types WHERE {FILTER}"))
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, LeaveTypeRow>(&format!(
        "SELECT * FROM leave_types WHERE {FILTER} ORDER BY is_default DESC, name LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/leave-types/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LeaveTypeRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_leave_type(&state.db, id).await?)))
}

/// POST /api/v1/leave-types
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateLeaveType>,
) -> Result<(StatusCode, Json<ApiResponse<LeaveTypeRow>>), AppError> {
    user.require_admin()?;
    let name = require_text("name", &req.name)?;
    let days = validate_days(req.days_per_year)?;

    let row = sqlx::query_as::<_, LeaveTypeRow>(
        r#"
        INSERT INTO leave_types (name, description, days_per_year, is_paid)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&req.description)
    .bind(days)
    .bind(req.is_paid)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, &format!("Leave type '{name}'")))?;

    info!("Leave type '{}' created ({} days)", row.name, row.days_per_year);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Leave type created successfully")),
    ))
}

/// PUT /api/v1/leave-types/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLeaveType>,
) -> Result<Json<ApiResponse<LeaveTypeRow>>, AppError> {
    user.require_admin()?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    let days = req.days_per_year.map(validate_days).transpose()?;
    fetch_leave_type(&state.db, id).await?;

    let row = sqlx::query_as::<_, LeaveTypeRow>(
        r#"
        UPDATE leave_types SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            days_per_year = COALESCE($4, days_per_year),
            is_paid = COALESCE($5, is_paid),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.description)
    .bind(days)
    .bind(req.is_paid)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Leave type name"))?;

    info!("Leave type {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        row,
        "Leave type updated successfully",
    )))
}

/// DELETE /api/v1/leave-types/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    let leave_type = fetch_leave_type(&state.db, id).await?;
    ensure_leave_type_deletable(&leave_type)?;

    sqlx::query("DELETE FROM leave_types WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Leave type '{}' deleted by {}", leave_type.name, user.user_id);
    Ok(Json(ApiResponse::message_only(
        "Leave type deleted successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_range() {
        assert_eq!(validate_days(0).unwrap(), 0);
        assert_eq!(validate_days(24).unwrap(), 24);
        assert!(validate_days(-1).is_err());
        assert!(validate_days(400).is_err());
    }
}
