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
use crate::models::org::RoleRow;
use crate::org::guards::ensure_role_deletable;
use crate::state::AppState;

/// (permission key, module, description)
pub const PERMISSIONS: &[(&str, &str, &str)] = &[
    ("branches.view", "branches", "View branches"),
    ("branches.manage", "branches", "Create, edit and delete branches"),
    ("departments.view", "departments", "View departments and teams"),
    ("departments.manage", "departments", "Create, edit and delete departments"),
    ("roles.manage", "roles", "Manage roles and their permissions"),
    ("designations.manage", "designations", "Manage designations"),
    ("leave_types.manage", "leave_types", "Manage leave types"),
    ("employees.view", "employees", "View employee directory"),
    ("employees.manage", "employees", "Create, edit and deactivate employees"),
    ("jobs.view", "jobs", "View job listings"),
    ("jobs.manage", "jobs", "Create and edit job listings"),
    ("candidates.manage", "candidates", "Manage candidates and matching"),
    ("interviews.schedule", "interviews", "Schedule interviews"),
    ("feedback.submit", "feedback", "Submit interview feedback"),
    ("profit.view", "profit", "View company-facing profit figures"),
];

#[derive(Debug, Serialize)]
pub struct Permission {
    pub key: &'static str,
    pub module: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Deduplicates and checks every permission against the catalogue.
pub fn normalize_permissions(requested: &[String]) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::with_capacity(requested.len());
    for p in requested {
        let key = p.trim();
        if !PERMISSIONS.iter().any(|(k, _, _)| *k == key) {
            return Err(AppError::Validation(format!("Unknown permission '{key}'")));
        }
        if !out.iter().any(|existing| existing == key) {
            out.push(key.to_string());
        }
    }
    out.sort();
    Ok(out)
}

async fn fetch_role(pool: &PgPool, id: Uuid) -> Result<RoleRow, AppError> {
    sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Role", id))
}

/// GET /api/v1/permissions
pub async fn handle_permissions(_user: CurrentUser) -> Json<ApiResponse<Vec<Permission>>> {
    let catalogue = PERMISSIONS
        .iter()
        .map(|&(key, module, description)| Permission {
            key,
            module,
            description,
        })
        .collect();
    Json(ApiResponse::ok(catalogue))
}

/// GET /api/v1/roles
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<RoleRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "name ILIKE $1 OR COALESCE(description, '') ILIKE $1";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM roles WHERE {FILTER}"))
        .bind(&pattern)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, RoleRow>(&format!(
        "SELECT * FROM roles WHERE {FILTER} ORDER BY is_system DESC, name LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/roles/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RoleRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_role(&state.db, id).await?)))
}

/// POST /api/v1/roles
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateRole>,
) -> Result<(StatusCode, Json<ApiResponse<RoleRow>>), AppError> {
    user.require_admin()?;
    let name = require_text("name", &req.name)?;
    let permissions = normalize_permissions(&req.permissions)?;

    let row = sqlx::query_as::<_, RoleRow>(
        "INSERT INTO roles (name, description, permissions) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&name)
    .bind(&req.description)
    .bind(&permissions)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, &format!("Role '{name}'")))?;

    info!("Role '{}' created with {} permission(s)", row.name, row.permissions.len());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Role created successfully")),
    ))
}

/// PUT /api/v1/roles/:id
///
/// System roles keep their name; their permissions may still be edited.
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRole>,
) -> Result<Json<ApiResponse<RoleRow>>, AppError> {
    user.require_admin()?;
    let existing = fetch_role(&state.db, id).await?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    if existing.is_system && name.as_deref().is_some_and(|n| n != existing.name) {
        return Err(AppError::Conflict(format!(
            "System role '{}' cannot be renamed",
            existing.name
        )));
    }
    let permissions = req
        .permissions
        .as_deref()
        .map(normalize_permissions)
        .transpose()?;

    let row = sqlx::query_as::<_, RoleRow>(
        r#"
        UPDATE roles SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            permissions = COALESCE($4, permissions),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(req.description)
    .bind(permissions)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Role name"))?;

    info!("Role {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(row, "Role updated successfully")))
}

/// DELETE /api/v1/roles/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    let role = fetch_role(&state.db, id).await?;
    ensure_role_deletable(&role)?;

    sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Role '{}' deleted by {}", role.name, user.user_id);
    Ok(Json(ApiResponse::message_only("Role deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dedups_and_sorts() {
        let got = normalize_permissions(&[
            "jobs.view".to_string(),
            " branches.view ".to_string(),
            "jobs.view".to_string(),
        ])
        .unwrap();
        assert_eq!(got, vec!["branches.view", "jobs.view"]);
    }

    #[test]
    fn test_unknown_permission_rejected() {
        let err = normalize_permissions(&["root.everything".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_catalogue_keys_unique() {
        let mut keys: Vec<_> = PERMISSIONS.iter().map(|(k, _, _)| *k).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), PERMISSIONS.len());
    }
}
