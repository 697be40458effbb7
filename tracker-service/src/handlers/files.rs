//! Spreadsheet upload endpoint.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;

use crate::dtos::transactions::UploadResponse;
use crate::middleware::AuthUser;
use crate::services::ingest::UploadMeta;
use crate::startup::AppState;

/// Content types the supported issuer exports arrive as.
const SPREADSHEET_MIME_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let original_name = field.file_name().unwrap_or("unnamed").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    if !SPREADSHEET_MIME_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Unsupported content type: {}",
            content_type
        )));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?;

    if data.len() > state.config.upload.max_bytes {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max {} bytes)",
            state.config.upload.max_bytes
        )));
    }

    tracing::info!(
        user_id = %user.user_id,
        filename = %original_name,
        size = data.len(),
        "File upload started"
    );

    let meta = UploadMeta {
        original_name,
        file_size: data.len() as i64,
    };

    let summary = state
        .ingest
        .ingest_file(&data, user.user_id, meta)
        .await
        .map_err(AppError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id: summary.file_id,
            issuer: summary.issuer,
            persisted: summary.persisted,
            skipped: summary.skipped,
        }),
    ))
}
