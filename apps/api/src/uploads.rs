//! Development upload side-channel: `POST /direct-upload` stores a file under
//! the upload directory and `/uploads/*` serves it back.

use std::path::Path;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub file_name: String,
    pub size: usize,
}

/// Last path segment of `original`, reduced to `[A-Za-z0-9._-]`.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let name: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if name.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

/// Writes `bytes` as `<uuid>-<sanitized name>` and returns the stored name.
pub async fn store_upload(dir: &Path, original: &str, bytes: &[u8]) -> anyhow::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let stored = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original));
    tokio::fs::write(dir.join(&stored), bytes).await?;
    Ok(stored)
}

/// POST /direct-upload
/// Multipart form with a single `file` field.
pub async fn handle_direct_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let stored = store_upload(&state.config.upload_dir, &original, &bytes).await?;
        let url = format!("{}/uploads/{}", state.config.public_base_url, stored);
        info!("Stored upload '{}' ({} bytes) as {}", original, bytes.len(), stored);
        return Ok(Json(UploadResponse {
            success: true,
            url,
            file_name: stored,
            size: bytes.len(),
        }));
    }

    Err(AppError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}
