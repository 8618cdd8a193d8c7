use std::sync::Arc;

use crate::config::Config;
use crate::events::queue::RedisEventQueue;
use crate::pipeline::{Pipeline, RecordStore};
use crate::storage::S3Storage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Same store the pipeline writes to; read side of the applications API.
    pub store: Arc<dyn RecordStore>,
    pub storage: S3Storage,
    pub queue: Arc<RedisEventQueue>,
    pub config: Config,
}
