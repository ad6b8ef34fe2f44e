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
use crate::jobs::listings::normalize_skills;
use crate::models::jobs::{CandidateStatus, JobCandidateRow};
use crate::org::employees::validate_email;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCandidate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: f64,
    pub expected_rate: Option<f64>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience_years: Option<f64>,
    pub expected_rate: Option<f64>,
    pub resume_url: Option<String>,
    pub status: Option<CandidateStatus>,
}

fn validate_experience(years: f64) -> Result<f64, AppError> {
    if !years.is_finite() || !(0.0..=60.0).contains(&years) {
        return Err(AppError::Validation(
            "experience_years must be between 0 and 60".to_string(),
        ));
    }
    Ok(years)
}

fn validate_rate(rate: f64) -> Result<f64, AppError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(AppError::Validation(
            "expected_rate must be a non-negative number".to_string(),
        ));
    }
    Ok(rate)
}

pub async fn fetch_candidate(pool: &PgPool, id: Uuid) -> Result<JobCandidateRow, AppError> {
    sqlx::query_as::<_, JobCandidateRow>("SELECT * FROM job_candidates WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Candidate", id))
}

/// GET /api/v1/candidates
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<JobCandidateRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str =
        "name ILIKE $1 OR email ILIKE $1 OR array_to_string(skills, ' ') ILIKE $1";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM job_candidates WHERE {FILTER}"))
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, JobCandidateRow>(&format!(
        "SELECT * FROM job_candidates WHERE {FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobCandidateRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_candidate(&state.db, id).await?)))
}

/// POST /api/v1/candidates
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateCandidate>,
) -> Result<(StatusCode, Json<ApiResponse<JobCandidateRow>>), AppError> {
    user.require_staff()?;
    let name = require_text("name", &req.name)?;
    let email = validate_email(&req.email)?;
    let experience = validate_experience(req.experience_years)?;
    let rate = req.expected_rate.map(validate_rate).transpose()?;

    let row = sqlx::query_as::<_, JobCandidateRow>(
        r#"
        INSERT INTO job_candidates (name, email, skills, experience_years, expected_rate, resume_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&email)
    .bind(normalize_skills(&req.skills))
    .bind(experience)
    .bind(rate)
    .bind(&req.resume_url)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, &format!("Candidate with email '{email}'")))?;

    info!("Candidate {} added by {}", row.name, user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Candidate created successfully")),
    ))
}

/// PUT /api/v1/candidates/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCandidate>,
) -> Result<Json<ApiResponse<JobCandidateRow>>, AppError> {
    user.require_staff()?;
    fetch_candidate(&state.db, id).await?;
    let name = req.name.as_deref().map(|n| require_text("name", n)).transpose()?;
    let email = req.email.as_deref().map(validate_email).transpose()?;
    let experience = req.experience_years.map(validate_experience).transpose()?;
    let rate = req.expected_rate.map(validate_rate).transpose()?;
    let skills = req.skills.as_deref().map(normalize_skills);

    let row = sqlx::query_as::<_, JobCandidateRow>(
        r#"
        UPDATE job_candidates SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            skills = COALESCE($4, skills),
            experience_years = COALESCE($5, experience_years),
            expected_rate = COALESCE($6, expected_rate),
            resume_url = COALESCE($7, resume_url),
            status = COALESCE($8, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(skills)
    .bind(experience)
    .bind(rate)
    .bind(req.resume_url)
    .bind(req.status.map(CandidateStatus::as_str))
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Candidate email"))?;

    info!("Candidate {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        row,
        "Candidate updated successfully",
    )))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user.require_staff()?;
    let candidate = fetch_candidate(&state.db, id).await?;
    let interviews: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM interviews WHERE candidate_id = $1")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if interviews > 0 {
        return Err(AppError::Conflict(format!(
            "Candidate '{}' has {interviews} interview(s); reject instead of deleting",
            candidate.name
        )));
    }

    sqlx::query("DELETE FROM job_candidates WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Candidate '{}' deleted by {}", candidate.name, user.user_id);
    Ok(Json(ApiResponse::message_only(
        "Candidate deleted successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_bounds() {
        assert_eq!(validate_experience(0.0).unwrap(), 0.0);
        assert_eq!(validate_experience(7.5).unwrap(), 7.5);
        assert!(validate_experience(-1.0).is_err());
        assert!(validate_experience(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rate_non_negative() {
        assert!(validate_rate(85.0).is_ok());
        assert!(validate_rate(-5.0).is_err());
    }

    #[test]
    fn test_status_update_payload() {
        let req: UpdateCandidate =
            serde_json::from_str(r#"{"status":"interviewing"}"#).unwrap();
        assert_eq!(req.status, Some(CandidateStatus::Interviewing));
        assert!(req.name.is_none());
    }
}
