use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One uploaded document waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
    /// Storage bucket holding the document.
    pub container: String,
    /// Object key inside the bucket, usually the uploaded filename.
    pub object_id: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl DocumentEvent {
    pub fn new(container: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object_id: object_id.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Short reference used in logs and error reports.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.container, self.object_id)
    }
}

/// Best-effort identity fields pulled from a CV. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    /// E.164, e.g. `+14155550100`.
    pub phone: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// The persisted application. Append-only: never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub application_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cv_url: String,
    pub submitted_at: DateTime<Utc>,
}
