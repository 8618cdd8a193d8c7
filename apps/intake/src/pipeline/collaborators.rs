//! Narrow interfaces to the external systems the pipeline talks to.
//!
//! The pipeline holds each one as `Arc<dyn Trait>`; implementations must be
//! safe to call from many concurrent invocations.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::application::ApplicationRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Object {container}/{object_id} not found")]
    NotFound { container: String, object_id: String },

    #[error("Storage I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Application id {0} already exists")]
    DuplicateId(String),

    #[error("Record store error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Reads raw document bytes from object storage.
#[async_trait]
pub trait StorageFetcher: Send + Sync {
    async fn fetch(&self, container: &str, object_id: &str) -> Result<Bytes, FetchError>;
}

/// Durable, append-only home of application records.
///
/// `insert` is idempotent on `application_id`: re-inserting an identical
/// record succeeds, a different record under a taken id is `DuplicateId`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &ApplicationRecord) -> Result<(), PersistError>;

    async fn get(&self, application_id: &str) -> Result<Option<ApplicationRecord>, PersistError>;
}

/// Sends the applicant a confirmation message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        to_email: &str,
        display_name: &str,
        application_id: &str,
    ) -> Result<(), NotifyError>;
}
