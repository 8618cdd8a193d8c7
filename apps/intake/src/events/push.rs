//! Pub/Sub push envelope:
//! `{"message": {"data": "<base64 of {\"bucket\": ..., \"filename\": ...}>"}}`.

use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::models::application::DocumentEvent;

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
    pub data: String,
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
}

/// Decoded `data` of a push message.
#[derive(Debug, Deserialize)]
struct StorageNotice {
    #[serde(default)]
    bucket: String,
    #[serde(default)]
    filename: String,
    #[serde(default, alias = "contentType")]
    content_type: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("message data is not valid base64: {0}")]
    Encoding(String),

    #[error("message data is not a storage notice: {0}")]
    Payload(String),

    #[error("event is missing {0}")]
    MissingField(&'static str),
}

impl PushEnvelope {
    pub fn into_event(self) -> Result<DocumentEvent, PushError> {
        decode_event(&self.message.data)
    }
}

/// Decodes base64 `data` into a `DocumentEvent`. Blank bucket or filename is rejected.
pub fn decode_event(data: &str) -> Result<DocumentEvent, PushError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| PushError::Encoding(e.to_string()))?;
    let notice: StorageNotice =
        serde_json::from_slice(&raw).map_err(|e| PushError::Payload(e.to_string()))?;

    let bucket = notice.bucket.trim();
    let filename = notice.filename.trim();
    if bucket.is_empty() {
        return Err(PushError::MissingField("bucket"));
    }
    if filename.is_empty() {
        return Err(PushError::MissingField("filename"));
    }

    let event = DocumentEvent::new(bucket, filename);
    Ok(match notice.content_type {
        Some(content_type) => event.with_content_type(content_type),
        None => event,
    })
}
