use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::envelope::{require_text, ApiResponse};
use crate::errors::AppError;
use crate::jobs::candidates::fetch_candidate;
use crate::jobs::listings::fetch_job;
use crate::screening::session::ScreeningSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateScreening {
    pub candidate_id: Uuid,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    /// "ice-candidate", "offer", "answer", ...
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RecordingRequest {
    pub recording: bool,
}

/// POST /api/v1/screenings
pub async fn handle_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateScreening>,
) -> Result<(StatusCode, Json<ApiResponse<ScreeningSession>>), AppError> {
    user.require_staff()?;
    let candidate = fetch_candidate(&state.db, req.candidate_id).await?;
    if let Some(job_id) = req.job_id {
        fetch_job(&state.db, job_id).await?;
    }

    sqlx::query(
        "UPDATE job_candidates SET status = 'screening', updated_at = NOW() \
         WHERE id = $1 AND status = 'new'",
    )
    .bind(candidate.id)
    .execute(&state.db)
    .await?;

    let session = state
        .screenings
        .create(candidate.id, req.job_id, user.user_id)
        .await;
    info!("Screening {} opened for {}", session.id, candidate.name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(session, "Screening session created")),
    ))
}

/// GET /api/v1/screenings
pub async fn handle_list(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Json<ApiResponse<Vec<ScreeningSession>>> {
    Json(ApiResponse::ok(state.screenings.list().await))
}

/// GET /api/v1/screenings/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScreeningSession>>, AppError> {
    Ok(Json(ApiResponse::ok(state.screenings.get(id).await?)))
}

/// POST /api/v1/screenings/:id/connect
pub async fn handle_connect(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScreeningSession>>, AppError> {
    user.require_staff()?;
    let session = state.screenings.connect(id).await?;
    info!("Screening {id} connecting");
    Ok(Json(ApiResponse::with_message(session, "Connecting")))
}

/// POST /api/v1/screenings/:id/signal
pub async fn handle_signal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SignalRequest>,
) -> Result<Json<ApiResponse<ScreeningSession>>, AppError> {
    user.require_staff()?;
    let kind = require_text("kind", &req.kind)?;
    let session = state.screenings.signal(id, &kind, &req.payload).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/v1/screenings/:id/recording
pub async fn handle_recording(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordingRequest>,
) -> Result<Json<ApiResponse<ScreeningSession>>, AppError> {
    user.require_staff()?;
    let session = state.screenings.set_recording(id, req.recording).await?;
    let message = if session.recording {
        "Recording started"
    } else {
        "Recording stopped"
    };
    info!("Screening {id}: {message}");
    Ok(Json(ApiResponse::with_message(session, message)))
}

/// POST /api/v1/screenings/:id/end
pub async fn handle_end(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScreeningSession>>, AppError> {
    user.require_staff()?;
    let session = state.screenings.end(id).await?;
    info!(
        "Screening {id} ended with score {}",
        session.score.unwrap_or_default()
    );
    Ok(Json(ApiResponse::with_message(session, "Screening ended")))
}
