//! Pipeline orchestrator. One linear pass per incoming document:
//!
//! `Received → Fetched → Extracted → Resolved → Built → Persisted → Notified? → Done`
//!
//! Storage fetch, record insert and notification are the only suspension
//! points. Extraction is CPU-bound and runs on the blocking pool. The pipeline
//! keeps no mutable state, so any number of invocations may run in parallel.

pub mod collaborators;
pub mod error;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::application::ApplicationBuilder;
use crate::contact;
use crate::extraction::{self, DocumentFormat, ExtractionError};
use crate::models::application::{ApplicationRecord, DocumentEvent};

pub use collaborators::{FetchError, Notifier, NotifyError, PersistError, RecordStore, StorageFetcher};
pub use error::{PipelineError, PipelineErrorReport, Stage};

/// Display name used in the confirmation when no name could be resolved.
pub const FALLBACK_DISPLAY_NAME: &str = "Applicant";

/// What happened to the confirmation after the record was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    /// No email address was resolved.
    Skipped,
    /// Sending failed; the record is still persisted.
    Failed(String),
}

/// Successful outcome of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Processed {
    pub record: ApplicationRecord,
    pub notification: NotificationStatus,
}

pub struct Pipeline {
    fetcher: Arc<dyn StorageFetcher>,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    builder: ApplicationBuilder,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn StorageFetcher>,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        builder: ApplicationBuilder,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            builder,
        }
    }

    /// Processes one event and returns the persisted record.
    ///
    /// A failed confirmation email does not fail this call.
    pub async fn handle(&self, event: &DocumentEvent) -> Result<ApplicationRecord, PipelineError> {
        self.process(event).await.map(|processed| processed.record)
    }

    /// Like `handle`, but also reports how the notification stage went.
    pub async fn process(&self, event: &DocumentEvent) -> Result<Processed, PipelineError> {
        let event_ref = event.reference();
        let span = info_span!("pipeline", event = %event_ref);
        self.run(event, &event_ref).instrument(span).await
    }

    async fn run(&self, event: &DocumentEvent, event_ref: &str) -> Result<Processed, PipelineError> {
        debug!(stage = %Stage::Received, "Processing document event");

        // Received → Fetched
        let bytes = self
            .fetcher
            .fetch(&event.container, &event.object_id)
            .await
            .map_err(|e| PipelineError::fetch(event_ref, e))?;
        debug!(stage = %Stage::Fetched, size = bytes.len(), "Fetched document");

        // Fetched → Extracted
        let format = DocumentFormat::detect(event.content_type.as_deref(), &event.object_id)
            .map_err(|e| PipelineError::extraction(event_ref, e))?;
        let extracted = tokio::task::spawn_blocking(move || extraction::extract(&bytes, format))
            .await
            .map_err(|e| {
                PipelineError::extraction(event_ref, ExtractionError::malformed(format, e))
            })?
            .map_err(|e| PipelineError::extraction(event_ref, e))?;
        debug!(
            stage = %Stage::Extracted,
            format = %extracted.format,
            chars = extracted.text.len(),
            "Extracted text"
        );

        // Extracted → Resolved
        let contact = contact::resolve(&extracted.text);
        debug!(
            stage = %Stage::Resolved,
            has_name = contact.name.is_some(),
            has_email = contact.email.is_some(),
            has_phone = contact.phone.is_some(),
            "Resolved contact info"
        );
        if contact.is_empty() {
            warn!("No contact details found in document");
        }

        // Resolved → Built
        let record = self
            .builder
            .build(contact, &event.container, &event.object_id);
        debug!(
            stage = %Stage::Built,
            application_id = %record.application_id,
            "Built application record"
        );

        // Built → Persisted
        let record = self.persist(record, event_ref).await?;
        info!(
            stage = %Stage::Persisted,
            application_id = %record.application_id,
            "Processed CV"
        );

        // Persisted → Notified (optional)
        let notification = self.notify(&record, event_ref).await;

        debug!(stage = %Stage::Done, "Pipeline complete");
        Ok(Processed {
            record,
            notification,
        })
    }

    /// Inserts the record, regenerating the id once if it collides.
    async fn persist(
        &self,
        record: ApplicationRecord,
        event_ref: &str,
    ) -> Result<ApplicationRecord, PipelineError> {
        match self.store.insert(&record).await {
            Ok(()) => Ok(record),
            Err(PersistError::DuplicateId(id)) => {
                warn!(application_id = %id, "Application id collision, regenerating once");
                let reissued = self.builder.reissue(&record);
                self.store
                    .insert(&reissued)
                    .await
                    .map_err(|e| PipelineError::persist(event_ref, e))?;
                Ok(reissued)
            }
            Err(e) => Err(PipelineError::persist(event_ref, e)),
        }
    }

    /// Best-effort confirmation. Failures are logged and reported, never raised.
    async fn notify(&self, record: &ApplicationRecord, event_ref: &str) -> NotificationStatus {
        let Some(email) = record.email.as_deref() else {
            debug!("No email resolved, skipping confirmation");
            return NotificationStatus::Skipped;
        };
        let display_name = record.name.as_deref().unwrap_or(FALLBACK_DISPLAY_NAME);

        match self
            .notifier
            .send(email, display_name, &record.application_id)
            .await
        {
            Ok(()) => {
                debug!(stage = %Stage::Notified, "Confirmation sent");
                NotificationStatus::Sent
            }
            Err(e) => {
                let err = PipelineError::notify(event_ref, e);
                warn!(
                    kind = %err.kind,
                    application_id = %record.application_id,
                    "Confirmation not sent: {err}"
                );
                NotificationStatus::Failed(err.cause.to_string())
            }
        }
    }
}
