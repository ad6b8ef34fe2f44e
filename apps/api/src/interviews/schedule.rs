use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{ApiResponse, ListQuery};
use crate::errors::AppError;
use crate::jobs::candidates::fetch_candidate;
use crate::jobs::listings::fetch_job;
use crate::models::interview::{InterviewMode, InterviewRow, InterviewStatus};
use crate::org::employees::fetch_employee;
use crate::state::AppState;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;

#[derive(Debug, Deserialize)]
pub struct CreateInterview {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub interviewer_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub mode: InterviewMode,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterview {
    pub interviewer_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub mode: Option<InterviewMode>,
    pub status: Option<InterviewStatus>,
    pub notes: Option<String>,
}

pub fn validate_duration(minutes: i32) -> Result<i32, AppError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(minutes)
}

/// Half-open intervals: a slot ending at 10:00 does not clash with one starting at 10:00.
fn slots_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

fn slot_end(start: DateTime<Utc>, minutes: i32) -> DateTime<Utc> {
    start + Duration::minutes(minutes as i64)
}

/// First non-cancelled interview in `existing` that overlaps the proposed slot.
/// `ignore` skips the interview being rescheduled.
pub fn find_conflict<'a>(
    existing: &'a [InterviewRow],
    start: DateTime<Utc>,
    minutes: i32,
    ignore: Option<Uuid>,
) -> Option<&'a InterviewRow> {
    let end = slot_end(start, minutes);
    existing.iter().find(|i| {
        Some(i.id) != ignore
            && i.status != InterviewStatus::Cancelled.as_str()
            && slots_overlap(start, end, i.scheduled_at, slot_end(i.scheduled_at, i.duration_minutes))
    })
}

/// Scheduled interviews may complete or be cancelled; both are final.
pub fn check_status_change(current: &str, next: InterviewStatus) -> Result<(), AppError> {
    if current == next.as_str() {
        return Ok(());
    }
    if current != InterviewStatus::Scheduled.as_str() {
        return Err(AppError::Conflict(format!(
            "Interview is already {current} and cannot become {}",
            next.as_str()
        )));
    }
    Ok(())
}

pub async fn fetch_interview(pool: &PgPool, id: Uuid) -> Result<InterviewRow, AppError> {
    sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Interview", id))
}

/// Rejects a slot that clashes with anything in `existing`.
pub fn check_slot(
    existing: &[InterviewRow],
    start: DateTime<Utc>,
    minutes: i32,
    ignore: Option<Uuid>,
) -> Result<(), AppError> {
    match find_conflict(existing, start, minutes, ignore) {
        Some(clash) => Err(AppError::Conflict(format!(
            "Interviewer already has an interview at {} ({} min)",
            clash.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
            clash.duration_minutes
        ))),
        None => Ok(()),
    }
}

/// Must run inside the transaction that writes the interview. The row lock
/// on the interviewer serializes concurrent bookings for the same person
/// until that transaction ends.
async fn ensure_interviewer_free(
    conn: &mut PgConnection,
    interviewer_id: Uuid,
    start: DateTime<Utc>,
    minutes: i32,
    ignore: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
        .bind(interviewer_id)
        .execute(&mut *conn)
        .await?;

    let window_start = start - Duration::minutes(MAX_DURATION_MINUTES as i64);
    let window_end = slot_end(start, minutes);
    let nearby = sqlx::query_as::<_, InterviewRow>(
        r#"
        SELECT * FROM interviews
        WHERE interviewer_id = $1 AND status <> 'cancelled'
          AND scheduled_at > $2 AND scheduled_at < $3
        "#,
    )
    .bind(interviewer_id)
    .bind(window_start)
    .bind(window_end)
    .fetch_all(&mut *conn)
    .await?;

    check_slot(&nearby, start, minutes, ignore)
}

async fn ensure_active_interviewer(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let interviewer = fetch_employee(pool, id).await?;
    if !interviewer.is_active {
        return Err(AppError::Validation(format!(
            "Interviewer {} is not an active employee",
            interviewer.name
        )));
    }
    Ok(())
}

/// GET /api/v1/interviews
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<InterviewRow>>>, AppError> {
    let pattern = q.search_pattern();
    const FROM: &str = "FROM interviews i \
        JOIN job_candidates c ON c.id = i.candidate_id \
        JOIN job_listings j ON j.id = i.job_id \
        WHERE c.name ILIKE $1 OR j.title ILIKE $1 OR COALESCE(i.notes, '') ILIKE $1";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FROM}"))
        .bind(&pattern)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, InterviewRow>(&format!(
        "SELECT i.* {FROM} ORDER BY i.scheduled_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(q.limit() as i64)
    .bind(q.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paged(rows, q.pagination(total))))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InterviewRow>>, AppError> {
    Ok(Json(ApiResponse::ok(fetch_interview(&state.db, id).await?)))
}

/// POST /api/v1/interviews
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateInterview>,
) -> Result<(StatusCode, Json<ApiResponse<InterviewRow>>), AppError> {
    user.require_staff()?;
    let minutes = validate_duration(req.duration_minutes)?;
    let job = fetch_job(&state.db, req.job_id).await?;
    let candidate = fetch_candidate(&state.db, req.candidate_id).await?;
    ensure_active_interviewer(&state.db, req.interviewer_id).await?;

    let mut tx = state.db.begin().await?;
    ensure_interviewer_free(&mut *tx, req.interviewer_id, req.scheduled_at, minutes, None).await?;
    let row = sqlx::query_as::<_, InterviewRow>(
        r#"
        INSERT INTO interviews
            (job_id, candidate_id, interviewer_id, scheduled_at, duration_minutes, mode, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(job.id)
    .bind(candidate.id)
    .bind(req.interviewer_id)
    .bind(req.scheduled_at)
    .bind(minutes)
    .bind(req.mode.as_str())
    .bind(&req.notes)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE job_candidates SET status = 'interviewing', updated_at = NOW() \
         WHERE id = $1 AND status IN ('new', 'screening')",
    )
    .bind(candidate.id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "Interview scheduled: {} for '{}' at {}",
        candidate.name, job.title, row.scheduled_at
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Interview scheduled successfully")),
    ))
}

/// PUT /api/v1/interviews/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInterview>,
) -> Result<Json<ApiResponse<InterviewRow>>, AppError> {
    user.require_staff()?;
    let existing = fetch_interview(&state.db, id).await?;
    if let Some(status) = req.status {
        check_status_change(&existing.status, status)?;
    }

    let rescheduling =
        req.scheduled_at.is_some() || req.duration_minutes.is_some() || req.interviewer_id.is_some();
    let mut tx = state.db.begin().await?;
    if rescheduling {
        if existing.status != InterviewStatus::Scheduled.as_str() {
            return Err(AppError::Conflict(format!(
                "A {} interview cannot be rescheduled",
                existing.status
            )));
        }
        let minutes = validate_duration(req.duration_minutes.unwrap_or(existing.duration_minutes))?;
        let start = req.scheduled_at.unwrap_or(existing.scheduled_at);
        let interviewer = req.interviewer_id.unwrap_or(existing.interviewer_id);
        if req.interviewer_id.is_some() {
            ensure_active_interviewer(&state.db, interviewer).await?;
        }
        if req.status != Some(InterviewStatus::Cancelled) {
            ensure_interviewer_free(&mut *tx, interviewer, start, minutes, Some(id)).await?;
        }
    }

    let row = sqlx::query_as::<_, InterviewRow>(
        r#"
        UPDATE interviews SET
            interviewer_id = COALESCE($2, interviewer_id),
            scheduled_at = COALESCE($3, scheduled_at),
            duration_minutes = COALESCE($4, duration_minutes),
            mode = COALESCE($5, mode),
            status = COALESCE($6, status),
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.interviewer_id)
    .bind(req.scheduled_at)
    .bind(req.duration_minutes)
    .bind(req.mode.map(InterviewMode::as_str))
    .bind(req.status.map(InterviewStatus::as_str))
    .bind(req.notes)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Interview {} updated by {} (status {})", row.id, user.user_id, row.status);
    Ok(Json(ApiResponse::with_message(
        row,
        "Interview updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    fn interview(start: DateTime<Utc>, minutes: i32, status: InterviewStatus) -> InterviewRow {
        InterviewRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            interviewer_id: Uuid::new_v4(),
            scheduled_at: start,
            duration_minutes: minutes,
            mode: InterviewMode::Video.as_str().to_string(),
            status: status.as_str().to_string(),
            notes: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_no_overlap_back_to_back() {
        let existing = vec![interview(at(9, 0), 60, InterviewStatus::Scheduled)];
        assert!(find_conflict(&existing, at(10, 0), 30, None).is_none());
        assert!(find_conflict(&existing, at(8, 0), 60, None).is_none());
    }

    #[test]
    fn test_overlap_partial() {
        let existing = vec![interview(at(9, 0), 60, InterviewStatus::Scheduled)];
        assert!(find_conflict(&existing, at(9, 45), 30, None).is_some());
        assert!(find_conflict(&existing, at(8, 30), 45, None).is_some());
    }

    #[test]
    fn test_contained_slot_conflicts() {
        let existing = vec![interview(at(9, 0), 120, InterviewStatus::Scheduled)];
        assert!(find_conflict(&existing, at(9, 30), 15, None).is_some());
    }

    #[test]
    fn test_cancelled_interviews_ignored() {
        let existing = vec![interview(at(9, 0), 60, InterviewStatus::Cancelled)];
        assert!(find_conflict(&existing, at(9, 0), 60, None).is_none());
    }

    #[test]
    fn test_rescheduled_interview_ignores_itself() {
        let existing = vec![interview(at(9, 0), 60, InterviewStatus::Scheduled)];
        let own = existing[0].id;
        assert!(find_conflict(&existing, at(9, 30), 60, Some(own)).is_none());
    }

    #[test]
    fn test_duration_bounds() {
        assert!(validate_duration(14).is_err());
        assert_eq!(validate_duration(15).unwrap(), 15);
        assert_eq!(validate_duration(480).unwrap(), 480);
        assert!(validate_duration(481).is_err());
    }

    #[test]
    fn test_status_changes() {
        assert!(check_status_change("scheduled", InterviewStatus::Completed).is_ok());
        assert!(check_status_change("scheduled", InterviewStatus::Cancelled).is_ok());
        assert!(check_status_change("completed", InterviewStatus::Completed).is_ok());
        assert!(check_status_change("cancelled", InterviewStatus::Scheduled).is_err());
        assert!(check_status_change("completed", InterviewStatus::Cancelled).is_err());
    }

    #[test]
    fn test_second_booking_of_same_slot_conflicts() {
        let mut booked = Vec::new();
        assert!(check_slot(&booked, at(14, 0), 60, None).is_ok());
        booked.push(interview(at(14, 0), 60, InterviewStatus::Scheduled));
        assert!(matches!(
            check_slot(&booked, at(14, 30), 30, None),
            Err(AppError::Conflict(_))
        ));
    }
}
