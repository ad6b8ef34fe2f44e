use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::envelope::ApiResponse;
use crate::interviews::schedule::fetch_interview;
use crate::models::interview::{FeedbackRow, InterviewStatus, Recommendation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitFeedback {
    pub technical: i16,
    pub communication: i16,
    pub culture_fit: i16,
    pub recommendation: Recommendation,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAggregate {
    pub count: usize,
    /// Mean of every rating across every form; `None` with no feedback.
    pub average_rating: Option<f64>,
    pub average_technical: Option<f64>,
    pub average_communication: Option<f64>,
    pub average_culture_fit: Option<f64>,
    pub recommendations: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackSummary {
    pub interview_id: Uuid,
    pub entries: Vec<FeedbackRow>,
    pub aggregate: FeedbackAggregate,
}

fn validate_rating(field: &str, value: i16) -> Result<i16, AppError> {
    if !(1..=5).contains(&value) {
        return Err(AppError::Validation(format!("{field} must be between 1 and 5")));
    }
    Ok(value)
}

fn mean(values: impl Iterator<Item = i16>) -> Option<f64> {
    let (sum, n) = values.fold((0i64, 0usize), |(s, n), v| (s + v as i64, n + 1));
    (n > 0).then(|| sum as f64 / n as f64)
}

pub fn aggregate(entries: &[FeedbackRow]) -> FeedbackAggregate {
    let mut recommendations = BTreeMap::new();
    for e in entries {
        *recommendations.entry(e.recommendation.clone()).or_insert(0) += 1;
    }
    FeedbackAggregate {
        count: entries.len(),
        average_rating: mean(
            entries
                .iter()
                .flat_map(|e| [e.technical, e.communication, e.culture_fit]),
        ),
        average_technical: mean(entries.iter().map(|e| e.technical)),
        average_communication: mean(entries.iter().map(|e| e.communication)),
        average_culture_fit: mean(entries.iter().map(|e| e.culture_fit)),
        recommendations,
    }
}

/// GET /api/v1/interviews/:id/feedback
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FeedbackSummary>>, AppError> {
    fetch_interview(&state.db, id).await?;
    let entries = sqlx::query_as::<_, FeedbackRow>(
        "SELECT * FROM interview_feedback WHERE interview_id = $1 ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let aggregate = aggregate(&entries);
    Ok(Json(ApiResponse::ok(FeedbackSummary {
        interview_id: id,
        entries,
        aggregate,
    })))
}

/// POST /api/v1/interviews/:id/feedback
pub async fn handle_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitFeedback>,
) -> Result<(StatusCode, Json<ApiResponse<FeedbackRow>>), AppError> {
    user.require_staff()?;
    let technical = validate_rating("technical", req.technical)?;
    let communication = validate_rating("communication", req.communication)?;
    let culture_fit = validate_rating("culture_fit", req.culture_fit)?;

    let interview = fetch_interview(&state.db, id).await?;
    if interview.status == InterviewStatus::Cancelled.as_str() {
        return Err(AppError::Conflict(
            "Cannot leave feedback on a cancelled interview".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, FeedbackRow>(
        r#"
        INSERT INTO interview_feedback
            (interview_id, reviewer_id, technical, communication, culture_fit, recommendation, comments)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(technical)
    .bind(communication)
    .bind(culture_fit)
    .bind(req.recommendation.as_str())
    .bind(&req.comments)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::unique_violation(e, "Feedback from this reviewer"))?;

    info!(
        "Feedback on interview {} from {}: {}",
        id, user.user_id, row.recommendation
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Feedback submitted successfully")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feedback(t: i16, c: i16, f: i16, rec: Recommendation) -> FeedbackRow {
        FeedbackRow {
            id: Uuid::new_v4(),
            interview_id: Uuid::nil(),
            reviewer_id: Uuid::new_v4(),
            technical: t,
            communication: c,
            culture_fit: f,
            recommendation: rec.as_str().to_string(),
            comments: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ratings_must_be_one_to_five() {
        assert!(validate_rating("technical", 0).is_err());
        assert!(validate_rating("technical", 6).is_err());
        assert_eq!(validate_rating("technical", 5).unwrap(), 5);
    }

    #[test]
    fn test_aggregate_averages_and_tally() {
        let entries = vec![
            feedback(5, 4, 3, Recommendation::Hire),
            feedback(3, 2, 1, Recommendation::NoHire),
            feedback(4, 4, 4, Recommendation::Hire),
        ];
        let agg = aggregate(&entries);
        assert_eq!(agg.count, 3);
        assert_eq!(agg.average_rating, Some(30.0 / 9.0));
        assert_eq!(agg.average_technical, Some(4.0));
        assert_eq!(agg.recommendations.get("hire"), Some(&2));
        assert_eq!(agg.recommendations.get("no_hire"), Some(&1));
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = aggregate(&[]);
        assert_eq!(agg.count, 0);
        assert!(agg.average_rating.is_none());
        assert!(agg.recommendations.is_empty());
    }
}
