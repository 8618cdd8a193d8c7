use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::DocumentEvent;
use crate::state::AppState;

/// Key prefix for uploaded CVs inside the bucket.
const UPLOAD_PREFIX: &str = "uploads";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub content_type: Option<String>,
    pub object_id: String,
}

/// POST /upload
/// Stores the multipart `file` field and queues it for processing.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(base_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation(format!("{filename} is empty")));
        }

        let object_id = object_key(&filename);
        let bucket = &state.config.s3_bucket;
        state
            .storage
            .put_document(bucket, &object_id, content_type.as_deref(), data)
            .await
            .map_err(|e| AppError::S3(e.to_string()))?;

        let event = DocumentEvent::new(bucket, &object_id);
        let event = match &content_type {
            Some(content_type) => event.with_content_type(content_type),
            None => event,
        };
        state.queue.publish(event).await?;

        info!(object_id = %object_id, "Accepted CV upload");
        return Ok(Json(UploadResponse {
            filename,
            content_type,
            object_id,
        }));
    }

    Err(AppError::Validation("Multipart field 'file' is required".to_string()))
}

/// Storage key for one upload. Unique per call, so applicants sending the
/// same filename never share an object.
fn object_key(filename: &str) -> String {
    format!("{UPLOAD_PREFIX}/{}-{filename}", Uuid::new_v4())
}

/// Drops any client-side directory components from an upload name.
fn base_name(name: &str) -> String {
    name.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
