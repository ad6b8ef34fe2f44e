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
use crate::models::org::BranchRow;
use crate::org::guards::ensure_branch_deletable;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_headquarters: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn fetch_branch(pool: &PgPool, id: Uuid) -> Result<BranchRow, AppError> {
    sqlx::query_as::<_, BranchRow>("SELECT * FROM branches WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Branch", id))
}

/// GET /api/v1/branches
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<BranchRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str =
        "name ILIKE $1 OR code ILIKE $1 OR COALESCE(description, '') ILIKE $1";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM branches WHERE {FILTER}"))
        .bind(&pattern)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, BranchRow>(&format!(
        "SELECT * FROM branches WHERE {FILTER} ORDER BY is_headquarters DESC, name LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/branches/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BranchRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_branch(&state.db, id).await?)))
}

/// POST /api/v1/branches
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateBranch>,
) -> Result<(StatusCode, Json<ApiResponse<BranchRow>>), AppError> {
    user.require_admin()?;
    let name = require_text("name", &req.name)?;
    let code = require_text("code", &req.code)?.to_uppercase();

    if req.is_headquarters {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM branches WHERE is_headquarters")
                .fetch_one(&state.db)
                .await?;
        if existing > 0 {
            return Err(AppError::Conflict(
                "A headquarters branch already exists".to_string(),
            ));
        }
    }

    let row = sqlx::query_as::<_, BranchRow>(
        r#"
        INSERT INTO branches (name, code, address, description, is_headquarters)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&code)
    .bind(&req.address)
    .bind(&req.description)
    .bind(req.is_headquarters)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, &format!("Branch code '{code}'")))?;

    info!("Branch '{}' ({}) created by {}", row.name, row.code, user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Branch created successfully")),
    ))
}

/// PUT /api/v1/branches/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBranch>,
) -> Result<Json<ApiResponse<BranchRow>>, AppError> {
    user.require_admin()?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    let code = req
        .code
        .as_deref()
        .map(|c| require_text("code", c).map(|c| c.to_uppercase()))
        .transpose()?;

    let existing = fetch_branch(&state.db, id).await?;
    if existing.is_headquarters && req.is_active == Some(false) {
        return Err(AppError::Conflict(
            "The headquarters branch cannot be deactivated".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, BranchRow>(
        r#"
        UPDATE branches SET
            name = COALESCE($2, name),
            code = COALESCE($3, code),
            address = COALESCE($4, address),
            description = COALESCE($5, description),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(code)
    .bind(req.address)
    .bind(req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Branch code"))?;

    info!("Branch {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(row, "Branch updated successfully")))
}

/// DELETE /api/v1/branches/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    let branch = fetch_branch(&state.db, id).await?;
    let departments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM departments WHERE branch_id = $1")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    ensure_branch_deletable(&branch, departments)?;

    let employees: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM employees WHERE branch_id = $1",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;
    if employees > 0 {
        return Err(AppError::Conflict(format!(
            "Branch '{}' still has {employees} employee(s)",
            branch.name
        )));
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM designations WHERE branch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM branches WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Branch '{}' deleted by {}", branch.name, user.user_id);
    Ok(Json(ApiResponse::message_only("Branch deleted successfully")))
}
