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
use crate::auth::roles::ensure_can_grant;
use crate::envelope::{require_text, ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::models::org::DesignationRow;
use crate::org::branches::fetch_branch;
use crate::org::guards::ensure_designation_deletable;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDesignation {
    pub branch_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDesignation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn fetch_designation(pool: &PgPool, id: Uuid) -> Result<DesignationRow, AppError> {
    sqlx::query_as::<_, DesignationRow>("SELECT * FROM designations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Designation", id))
}

/// GET /api/v1/designations
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<DesignationRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "($2::uuid IS NULL OR branch_id = $2) \
        AND (title ILIKE $1 OR COALESCE(description, '') ILIKE $1)";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM designations WHERE {FILTER}"))
            .bind(&pattern)
            .bind(q.branch_id)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, DesignationRow>(&format!(
        "SELECT * FROM designations WHERE {FILTER} ORDER BY title LIMIT $3 OFFSET $4"
    ))
    .bind(&pattern)
    .bind(q.branch_id)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/designations/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DesignationRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_designation(&state.db, id).await?)))
}

/// POST /api/v1/designations
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateDesignation>,
) -> Result<(StatusCode, Json<ApiResponse<DesignationRow>>), AppError> {
    user.require_admin()?;
    let title = require_text("title", &req.title)?;
    ensure_can_grant(user.role, &title)?;
    let branch = fetch_branch(&state.db, req.branch_id).await?;

    let row = sqlx::query_as::<_, DesignationRow>(
        "INSERT INTO designations (branch_id, title, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(branch.id)
    .bind(&title)
    .bind(&req.description)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        AppError::unique_violation(e, &format!("Designation '{title}' in branch '{}'", branch.name))
    })?;

    info!("Designation '{}' created in branch '{}'", row.title, branch.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Designation created successfully")),
    ))
}

/// PUT /api/v1/designations/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDesignation>,
) -> Result<Json<ApiResponse<DesignationRow>>, AppError> {
    user.require_admin()?;
    let existing = fetch_designation(&state.db, id).await?;
    let title = req
        .title
        .as_deref()
        .map(|t| require_text("title", t))
        .transpose()?;
    if let Some(t) = title.as_deref() {
        ensure_can_grant(user.role, t)?;
    }
    // Default titles are keys of the designation→role table.
    if existing.is_default && title.as_deref().is_some_and(|t| t != existing.title) {
        return Err(AppError::Conflict(format!(
            "Default designation '{}' cannot be renamed",
            existing.title
        )));
    }

    let row = sqlx::query_as::<_, DesignationRow>(
        r#"
        UPDATE designations SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            is_active = COALESCE($4, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Designation title"))?;

    info!("Designation {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        row,
        "Designation updated successfully",
    )))
}

/// DELETE /api/v1/designations/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    let designation = fetch_designation(&state.db, id).await?;
    let in_use: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE designation_id = $1")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    ensure_designation_deletable(&designation, in_use)?;

    sqlx::query("DELETE FROM designations WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Designation '{}' deleted by {}", designation.title, user.user_id);
    Ok(Json(ApiResponse::message_only(
        "Designation deleted successfully",
    )))
}
