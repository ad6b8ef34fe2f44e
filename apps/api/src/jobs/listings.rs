use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{require_text, ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::jobs::matching::CandidateMatch;
use crate::models::jobs::{JobCandidateRow, JobListingRow, JobStatus};
use crate::models::user::UserRole;
use crate::profit::calculator::{calculate, ProfitInputs, ProfitView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub title: String,
    pub client_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub client_budget: f64,
    pub company_profit_pct: f64,
    pub candidate_offer: f64,
    #[serde(default)]
    pub consultancy_fee_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJob {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub status: Option<JobStatus>,
    pub client_budget: Option<f64>,
    pub company_profit_pct: Option<f64>,
    pub candidate_offer: Option<f64>,
    pub consultancy_fee_pct: Option<f64>,
}

/// Job listing as shown to a given role. Company-side money fields are
/// omitted for roles without financial visibility.
#[derive(Debug, Serialize)]
pub struct JobListingView {
    pub id: Uuid,
    pub title: String,
    pub client_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub status: String,
    pub candidate_offer: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_profit_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultancy_fee_pct: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobListingView {
    pub fn for_role(row: JobListingRow, role: UserRole) -> Self {
        let financial = role.sees_company_financials();
        Self {
            id: row.id,
            title: row.title,
            client_name: row.client_name,
            location: row.location,
            description: row.description,
            skills: row.skills,
            status: row.status,
            candidate_offer: row.candidate_offer,
            client_budget: financial.then_some(row.client_budget),
            company_profit_pct: financial.then_some(row.company_profit_pct),
            consultancy_fee_pct: financial.then_some(row.consultancy_fee_pct),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobProfitSummary {
    pub job_id: Uuid,
    #[serde(flatten)]
    pub profit: ProfitView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultancy_fee: Option<f64>,
}

/// Maps a job's profit-split payload onto calculator inputs.
pub fn job_profit_inputs(job: &JobListingRow) -> ProfitInputs {
    ProfitInputs {
        client_budget: job.client_budget,
        internal_budget: job.candidate_offer,
        candidate_split: 100.0 - job.company_profit_pct,
        company_split: job.company_profit_pct,
    }
}

pub fn job_profit_summary(job: &JobListingRow, role: UserRole) -> JobProfitSummary {
    let breakdown = calculate(job_profit_inputs(job));
    let fee = job.client_budget * job.consultancy_fee_pct / 100.0;
    JobProfitSummary {
        job_id: job.id,
        profit: breakdown.visible_to(role),
        consultancy_fee: role.sees_company_financials().then_some(fee),
    }
}

fn validate_amount(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

fn validate_pct(field: &str, value: f64) -> Result<f64, AppError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(AppError::Validation(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(value)
}

pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in skills {
        let s = s.trim();
        if !s.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(s)) {
            out.push(s.to_string());
        }
    }
    out
}

pub async fn fetch_job(pool: &PgPool, id: Uuid) -> Result<JobListingRow, AppError> {
    sqlx::query_as::<_, JobListingRow>("SELECT * FROM job_listings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Job", id))
}

/// GET /api/v1/jobs
pub async fn handle_list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<JobListingView>>>, AppError> {
    let pattern = q.search_pattern();
    const FILTER: &str = "title ILIKE $1 OR client_name ILIKE $1 \
        OR COALESCE(location, '') ILIKE $1 OR array_to_string(skills, ' ') ILIKE $1";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM job_listings WHERE {FILTER}"))
            .bind(&pattern)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, JobListingRow>(&format!(
        "SELECT * FROM job_listings WHERE {FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    let views = rows
        .into_iter()
        .map(|r| JobListingView::for_role(r, user.role))
        .collect();
    Ok(Json(ApiResponse::paged(views, q.pagination(total))))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobListingView>>, AppError> {
    let job = fetch_job(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(JobListingView::for_role(job, user.role))))
}

/// POST /api/v1/jobs
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateJob>,
) -> Result<(StatusCode, Json<ApiResponse<JobListingView>>), AppError> {
    if !user.role.sees_company_financials() {
        return Err(AppError::Forbidden);
    }
    let title = require_text("title", &req.title)?;
    let client_name = require_text("client_name", &req.client_name)?;
    let client_budget = validate_amount("client_budget", req.client_budget)?;
    let candidate_offer = validate_amount("candidate_offer", req.candidate_offer)?;
    let company_profit_pct = validate_pct("company_profit_pct", req.company_profit_pct)?;
    let consultancy_fee_pct = validate_pct("consultancy_fee_pct", req.consultancy_fee_pct)?;
    let skills = normalize_skills(&req.skills);

    let row = sqlx::query_as::<_, JobListingRow>(
        r#"
        INSERT INTO job_listings
            (title, client_name, location, description, skills,
             client_budget, company_profit_pct, candidate_offer, consultancy_fee_pct)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&title)
    .bind(&client_name)
    .bind(&req.location)
    .bind(&req.description)
    .bind(&skills)
    .bind(client_budget)
    .bind(company_profit_pct)
    .bind(candidate_offer)
    .bind(consultancy_fee_pct)
    .fetch_one(&state.db)
    .await?;

    info!("Job '{}' for {} created by {}", row.title, row.client_name, user.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            JobListingView::for_role(row, user.role),
            "Job created successfully",
        )),
    ))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJob>,
) -> Result<Json<ApiResponse<JobListingView>>, AppError> {
    if !user.role.sees_company_financials() {
        return Err(AppError::Forbidden);
    }
    fetch_job(&state.db, id).await?;
    let title = req.title.as_deref().map(|t| require_text("title", t)).transpose()?;
    let client_name = req
        .client_name
        .as_deref()
        .map(|c| require_text("client_name", c))
        .transpose()?;
    let client_budget = req
        .client_budget
        .map(|v| validate_amount("client_budget", v))
        .transpose()?;
    let candidate_offer = req
        .candidate_offer
        .map(|v| validate_amount("candidate_offer", v))
        .transpose()?;
    let company_profit_pct = req
        .company_profit_pct
        .map(|v| validate_pct("company_profit_pct", v))
        .transpose()?;
    let consultancy_fee_pct = req
        .consultancy_fee_pct
        .map(|v| validate_pct("consultancy_fee_pct", v))
        .transpose()?;
    let skills = req.skills.as_deref().map(normalize_skills);

    let row = sqlx::query_as::<_, JobListingRow>(
        r#"
        UPDATE job_listings SET
            title = COALESCE($2, title),
            client_name = COALESCE($3, client_name),
            location = COALESCE($4, location),
            description = COALESCE($5, description),
            skills = COALESCE($6, skills),
            status = COALESCE($7, status),
            client_budget = COALESCE($8, client_budget),
            company_profit_pct = COALESCE($9, company_profit_pct),
            candidate_offer = COALESCE($10, candidate_offer),
            consultancy_fee_pct = COALESCE($11, consultancy_fee_pct),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(client_name)
    .bind(req.location)
    .bind(req.description)
    .bind(skills)
    .bind(req.status.map(JobStatus::as_str))
    .bind(client_budget)
    .bind(company_profit_pct)
    .bind(candidate_offer)
    .bind(consultancy_fee_pct)
    .fetch_one(&state.db)
    .await?;

    info!("Job {} updated by {}", row.id, user.user_id);
    Ok(Json(ApiResponse::with_message(
        JobListingView::for_role(row, user.role),
        "Job updated successfully",
    )))
}

/// DELETE /api/v1/jobs/:id
///
/// Jobs with interview history are closed instead of removed.
pub async fn handle_delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if !user.role.sees_company_financials() {
        return Err(AppError::Forbidden);
    }
    let job = fetch_job(&state.db, id).await?;
    let interviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interviews WHERE job_id = $1")
        .bind(id)
        .fetch_one(&state.db)
        .await?;

    if interviews > 0 {
        sqlx::query("UPDATE job_listings SET status = 'closed', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
        info!("Job '{}' closed (has {interviews} interview(s))", job.title);
        return Ok(Json(ApiResponse::message_only(
            "Job has interviews and was closed instead of deleted",
        )));
    }

    sqlx::query("DELETE FROM job_listings WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    info!("Job '{}' deleted by {}", job.title, user.user_id);
    Ok(Json(ApiResponse::message_only("Job deleted successfully")))
}

/// GET /api/v1/jobs/:id/matches
pub async fn handle_matches(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CandidateMatch>>>, AppError> {
    let job = fetch_job(&state.db, id).await?;
    let candidates = sqlx::query_as::<_, JobCandidateRow>(
        "SELECT * FROM job_candidates WHERE status NOT IN ('hired', 'rejected')",
    )
    .fetch_all(&state.db)
    .await?;

    let ranked = state.matcher.rank(&job, &candidates).await?;
    info!("Ranked {} candidate(s) for job '{}'", ranked.len(), job.title);
    Ok(Json(ApiResponse::ok(ranked)))
}

/// GET /api/v1/jobs/:id/profit
pub async fn handle_profit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobProfitSummary>>, AppError> {
    let job = fetch_job(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(job_profit_summary(&job, user.role))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobListingRow {
        let now = Utc::now();
        JobListingRow {
            id: Uuid::new_v4(),
            title: "Senior Rust Engineer".into(),
            client_name: "Acme".into(),
            location: Some("Remote".into()),
            description: None,
            skills: vec!["rust".into()],
            status: "open".into(),
            client_budget: 120.0,
            company_profit_pct: 20.0,
            candidate_offer: 90.0,
            consultancy_fee_pct: 5.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_payload_maps_to_calculator() {
        let inputs = job_profit_inputs(&job());
        assert_eq!(inputs.internal_budget, 90.0);
        assert_eq!(inputs.company_split, 20.0);
        assert_eq!(inputs.candidate_split, 80.0);
    }

    #[test]
    fn test_summary_for_ceo() {
        let summary = job_profit_summary(&job(), UserRole::Ceo);
        assert_eq!(summary.profit.total_profit, Some(48.0));
        assert_eq!(summary.consultancy_fee, Some(6.0));
    }

    #[test]
    fn test_summary_for_recruiter_hides_company_figures() {
        let summary = job_profit_summary(&job(), UserRole::MarketingRecruiter);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("total_profit").is_none());
        assert!(json.get("consultancy_fee").is_none());
        assert_eq!(json["candidate_payout"], 72.0);
    }

    #[test]
    fn test_listing_view_redacts_budget() {
        let json = serde_json::to_value(JobListingView::for_role(job(), UserRole::Applicant)).unwrap();
        assert!(json.get("client_budget").is_none());
        assert_eq!(json["candidate_offer"], 90.0);

        let json = serde_json::to_value(JobListingView::for_role(job(), UserRole::MarketingHead)).unwrap();
        assert_eq!(json["client_budget"], 120.0);
    }

    #[test]
    fn test_validation_helpers() {
        assert!(validate_pct("p", 101.0).is_err());
        assert!(validate_pct("p", 0.0).is_ok());
        assert!(validate_amount("a", -1.0).is_err());
        assert!(validate_amount("a", f64::NAN).is_err());
    }

    #[test]
    fn test_normalize_skills_dedups_case_insensitively() {
        let got = normalize_skills(&["Rust".into(), " rust ".into(), "".into(), "SQL".into()]);
        assert_eq!(got, vec!["Rust", "SQL"]);
    }
}
