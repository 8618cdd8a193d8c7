use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::pipeline::collaborators::{FetchError, NotifyError, PersistError};

/// Pipeline progression for one event. Strictly forward; no state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Fetched,
    Extracted,
    Resolved,
    Built,
    Persisted,
    Notified,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Fetched => "fetched",
            Stage::Extracted => "extracted",
            Stage::Resolved => "resolved",
            Stage::Built => "built",
            Stage::Persisted => "persisted",
            Stage::Notified => "notified",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    UnsupportedFormat,
    Extraction,
    Persist,
    DuplicateId,
    Notify,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch error",
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::Extraction => "extraction error",
            ErrorKind::Persist => "persist error",
            ErrorKind::DuplicateId => "duplicate application id",
            ErrorKind::Notify => "notify error",
        };
        f.write_str(name)
    }
}

/// Failure of one pipeline invocation, with enough context for the caller to
/// choose between redelivery and dead-lettering.
#[derive(Debug, Error)]
#[error("{kind} while reaching stage '{stage}' for {event_ref}: {cause}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    /// The stage the pipeline was trying to reach when it failed.
    pub stage: Stage,
    pub event_ref: String,
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl PipelineError {
    pub fn fetch(event_ref: &str, cause: FetchError) -> Self {
        Self::new(ErrorKind::Fetch, Stage::Fetched, event_ref, cause)
    }

    pub fn extraction(event_ref: &str, cause: ExtractionError) -> Self {
        let kind = match cause {
            ExtractionError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ExtractionError::Malformed { .. } => ErrorKind::Extraction,
        };
        Self::new(kind, Stage::Extracted, event_ref, cause)
    }

    pub fn persist(event_ref: &str, cause: PersistError) -> Self {
        let kind = match cause {
            PersistError::DuplicateId(_) => ErrorKind::DuplicateId,
            PersistError::Backend(_) => ErrorKind::Persist,
        };
        Self::new(kind, Stage::Persisted, event_ref, cause)
    }

    pub fn notify(event_ref: &str, cause: NotifyError) -> Self {
        Self::new(ErrorKind::Notify, Stage::Notified, event_ref, cause)
    }

    fn new(
        kind: ErrorKind,
        stage: Stage,
        event_ref: &str,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            stage,
            event_ref: event_ref.to_string(),
            cause: Box::new(cause),
        }
    }

    /// Fetch and persist failures may succeed on redelivery; malformed or
    /// unsupported documents never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Fetch | ErrorKind::Persist)
    }
}

/// Serializable summary of a `PipelineError` for HTTP bodies and dead letters.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineErrorReport {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub event_ref: String,
    pub cause: String,
    pub retryable: bool,
}

impl From<&PipelineError> for PipelineErrorReport {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind,
            stage: err.stage,
            event_ref: err.event_ref.clone(),
            cause: err.cause.to_string(),
            retryable: err.is_retryable(),
        }
    }
}
