use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::auth::password::hash_password;
use crate::auth::roles::ensure_can_grant;
use crate::envelope::{nullable, require_text, ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::models::org::{DepartmentRow, DesignationRow, EmployeeRow};
use crate::models::user::UserRole;
use crate::org::branches::fetch_branch;
use crate::org::departments::fetch_department;
use crate::org::designations::fetch_designation;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CreateEmployee {
    pub employee_code: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub branch_id: Uuid,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub joined_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// `null` clears the department.
    #[serde(default, deserialize_with = "nullable")]
    pub department_id: Option<Option<Uuid>>,
    /// `null` clears the designation.
    #[serde(default, deserialize_with = "nullable")]
    pub designation_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

pub fn validate_email(email: &str) -> Result<String, AppError> {
    let email = require_text("email", email)?.to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        })
        .unwrap_or(false);
    if !valid {
        return Err(AppError::Validation(format!("'{email}' is not a valid email")));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Department and designation must belong to the employee's branch.
pub fn check_placement(
    branch_id: Uuid,
    department: Option<&DepartmentRow>,
    designation: Option<&DesignationRow>,
) -> Result<(), AppError> {
    if let Some(d) = department {
        if d.branch_id != branch_id {
            return Err(AppError::Validation(format!(
                "Department '{}' belongs to a different branch",
                d.name
            )));
        }
    }
    if let Some(d) = designation {
        if d.branch_id != branch_id {
            return Err(AppError::Validation(format!(
                "Designation '{}' belongs to a different branch",
                d.title
            )));
        }
    }
    Ok(())
}

fn generated_code() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("EMP-{}", simple[..8].to_uppercase())
}

pub async fn fetch_employee(pool: &PgPool, id: Uuid) -> Result<EmployeeRow, AppError> {
    sqlx::query_as::<_, EmployeeRow>("SELECT * FROM employees WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Employee", id))
}

async fn resolve_placement(
    pool: &PgPool,
    caller: UserRole,
    branch_id: Uuid,
    department_id: Option<Uuid>,
    designation_id: Option<Uuid>,
) -> Result<(), AppError> {
    let department = match department_id {
        Some(id) => Some(fetch_department(pool, id).await?),
        None => None,
    };
    let designation = match designation_id {
        Some(id) => Some(fetch_designation(pool, id).await?),
        None => None,
    };
    if let Some(d) = &designation {
        ensure_can_grant(caller, &d.title)?;
    }
    check_placement(branch_id, department.as_ref(), designation.as_ref())
}

/// GET /api/v1/employees
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<EmployeeRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "($2::uuid IS NULL OR branch_id = $2) \
        AND ($3::uuid IS NULL OR department_id = $3) \
        AND (name ILIKE $1 OR email ILIKE $1 OR employee_code ILIKE $1)";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM employees WHERE {FILTER}"))
            .bind(&pattern)
            .bind(q.branch_id)
            .bind(q.department_id)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
        "SELECT * FROM employees WHERE {FILTER} ORDER BY name LIMIT $4 OFFSET $5"
    ))
    .bind(&pattern)
    .bind(q.branch_id)
    .bind(q.department_id)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/employees/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EmployeeRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_employee(&state.db, id).await?)))
}

/// POST /api/v1/employees
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateEmployee>,
) -> Result<(StatusCode, Json<ApiResponse<EmployeeRow>>), AppError> {
    user.require_admin()?;
    let name = require_text("name", &req.name)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;
    let code = match req.employee_code.as_deref() {
        Some(c) => require_text("employee_code", c)?.to_uppercase(),
        None => generated_code(),
    };

    let branch = fetch_branch(&state.db, req.branch_id).await?;
    resolve_placement(
        &state.db,
        user.role,
        branch.id,
        req.department_id,
        req.designation_id,
    )
    .await?;
    let password_hash = hash_password(&req.password)?;

    let row = sqlx::query_as::<_, EmployeeRow>(
        r#"
        INSERT INTO employees
            (employee_code, name, email, phone, password_hash,
             branch_id, department_id, designation_id, joined_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE))
        RETURNING *
        "#,
    )
    .bind(&code)
    .bind(&name)
    .bind(&email)
    .bind(&req.phone)
    .bind(&password_hash)
    .bind(branch.id)
    .bind(req.department_id)
    .bind(req.designation_id)
    .bind(req.joined_on)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, &format!("Employee with email '{email}' or code '{code}'")))?;

    info!("Employee {} ({}) created in branch '{}'", row.name, row.employee_code, branch.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Employee created successfully")),
    ))
}

/// PUT /api/v1/employees/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployee>,
) -> Result<Json<ApiResponse<EmployeeRow>>, AppError> {
    user.require_admin()?;
    let existing = fetch_employee(&state.db, id).await?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    let email = req.email.as_deref().map(validate_email).transpose()?;
    if id == user.user_id && req.is_active == Some(false) {
        return Err(AppError::Conflict(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    let password_hash = match req.password.as_deref() {
        Some(p) => {
            validate_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };
    resolve_placement(
        &state.db,
        user.role,
        existing.branch_id,
        req.department_id.flatten(),
        req.designation_id.flatten(),
    )
    .await?;

    let row = sqlx::query_as::<_, EmployeeRow>(
        r#"
        UPDATE employees SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            password_hash = COALESCE($5, password_hash),
            department_id = CASE WHEN $9 THEN $6 ELSE department_id END,
            designation_id = CASE WHEN $10 THEN $7 ELSE designation_id END,
            is_active = COALESCE($8, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(req.phone)
    .bind(password_hash)
    .bind(req.department_id.flatten())
    .bind(req.designation_id.flatten())
    .bind(req.is_active)
    .bind(req.department_id.is_some())
    .bind(req.designation_id.is_some())
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Employee email"))?;

    info!("Employee {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        row,
        "Employee updated successfully",
    )))
}

/// DELETE /api/v1/employees/:id
///
/// Employees are referenced by interviews and feedback, so deletion deactivates.
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_admin()?;
    if id == user.user_id {
        return Err(AppError::Conflict(
            "You cannot delete your own account".to_string(),
        ));
    }
    let employee = fetch_employee(&state.db, id).await?;

    sqlx::query("UPDATE employees SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Employee {} deactivated by {}", employee.employee_code, user.user_id);
    Ok(Json(ApiResponse::message_only(
        "Employee deactivated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn department(branch_id: Uuid) -> DepartmentRow {
        let now = Utc::now();
        DepartmentRow {
            id: Uuid::new_v4(),
            branch_id,
            name: "Talent Acquisition".into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn designation(branch_id: Uuid) -> DesignationRow {
        let now = Utc::now();
        DesignationRow {
            id: Uuid::new_v4(),
            branch_id,
            title: "Recruiter".into(),
            description: None,
            is_active: true,
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_email_validation_lowercases() {
        assert_eq!(
            validate_email("  Asha.Rao@Example.COM ").unwrap(),
            "asha.rao@example.com"
        );
        assert!(validate_email("asha").is_err());
        assert!(validate_email("asha@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn test_placement_same_branch_ok() {
        let branch = Uuid::new_v4();
        assert!(check_placement(branch, Some(&department(branch)), Some(&designation(branch))).is_ok());
        assert!(check_placement(branch, None, None).is_ok());
    }

    #[test]
    fn test_placement_cross_branch_rejected() {
        let branch = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(check_placement(branch, Some(&department(other)), None).is_err());
        assert!(check_placement(branch, None, Some(&designation(other))).is_err());
    }

    #[test]
    fn test_generated_code_shape() {
        let code = generated_code();
        assert!(code.starts_with("EMP-"));
        assert_eq!(code.len(), 12);
    }

    #[test]
    fn test_update_distinguishes_null_from_missing() {
        let dept = Uuid::new_v4();
        let req: UpdateEmployee = serde_json::from_value(serde_json::json!({
            "department_id": null,
            "designation_id": dept
        }))
        .unwrap();
        assert_eq!(req.department_id, Some(None));
        assert_eq!(req.designation_id, Some(Some(dept)));

        let req: UpdateEmployee = serde_json::from_value(serde_json::json!({"name": "Asha"})).unwrap();
        assert_eq!(req.department_id, None);
        assert_eq!(req.designation_id, None);
    }
}
