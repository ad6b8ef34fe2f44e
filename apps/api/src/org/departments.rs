use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{require_text, ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::models::org::{DepartmentRow, EmployeeRow};
use crate::org::branches::fetch_branch;
use crate::org::guards::ensure_department_deletable;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDepartment {
    pub branch_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Department with its members, used by the team view.
#[derive(Debug, Serialize)]
pub struct DepartmentDetail {
    #[serde(flatten)]
    pub department: DepartmentRow,
    pub members: Vec<EmployeeRow>,
}

pub async fn fetch_department(pool: &PgPool, id: Uuid) -> Result<DepartmentRow, AppError> {
    sqlx::query_as::<_, DepartmentRow>("SELECT * FROM departments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Department", id))
}

/// GET /api/v1/departments
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<DepartmentRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "($2::uuid IS NULL OR branch_id = $2) \
        AND (name ILIKE $1 OR COALESCE(description, '') ILIKE $1)";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM departments WHERE {FILTER}"))
            .bind(&pattern)
            .bind(q.branch_id)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, DepartmentRow>(&format!(
        "SELECT * FROM departments WHERE {FILTER} ORDER BY name LIMIT $3 OFFSET $4"
    ))
    .bind(&pattern)
    .bind(q.branch_id)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/departments/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DepartmentDetail>>, AppError> {
    let department = fetch_department(&state.db, id).await?;
    let members = sqlx::query_as::<_, EmployeeRow>(
        "SELECT * FROM employees WHERE department_id = $1 ORDER BY name",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::ok(DepartmentDetail {
        department,
        members,
    })))
}

/// POST /api/v1/departments
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateDepartment>,
) -> Result<(StatusCode, Json<ApiResponse<DepartmentRow>>), AppError> {
    user.require_admin()?;
    let name = require_text("name", &req.name)?;
    let branch = fetch_branch(&state.db, req.branch_id).await?;

    let row = sqlx::query_as::<_, DepartmentRow>(
        "INSERT INTO departments (branch_id, name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(branch.id)
    .bind(&name)
    .bind(&req.description)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        AppError::unique_violation(e, &format!("Department '{name}' in branch '{}'", branch.name))
    })?;

    info!("Department '{}' created in branch '{}'", row.name, branch.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Department created successfully")),
    ))
}

/// PUT /api/v1/departments/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDepartment>,
) -> Result<Json<ApiResponse<DepartmentRow>>, AppError> {
    user.require_admin()?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    fetch_department(&state.db, id).await?;

    let row = sqlx::query_as::<_, DepartmentRow>(
        r#"
        UPDATE departments SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            is_active = COALESCE($4, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Department name"))?;

    info!("Department {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        row,
        "Department updated successfully",
    )))
}

/// DELETE /api/v1/departments/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    let department = fetch_department(&state.db, id).await?;
    let members: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE department_id = $1")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    ensure_department_deletable(&department.name, members)?;

    sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Department '{}' deleted by {}", department.name, user.user_id);
    Ok(Json(ApiResponse::message_only(
        "Department deleted successfully",
    )))
}
