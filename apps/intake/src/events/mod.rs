//! How `DocumentEvent`s reach the pipeline.
//!
//! Delivery guarantees belong to the broker. The worker only decides, per
//! failed event, whether to hand it back for redelivery or dead-letter it.

pub mod push;
pub mod queue;
pub mod worker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::application::DocumentEvent;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Malformed queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One delivery of an event. `attempt` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub event: DocumentEvent,
    pub attempt: u32,
}

impl Delivery {
    pub fn first(event: DocumentEvent) -> Self {
        Self { event, attempt: 1 }
    }
}

/// Source of document events for the worker.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Waits briefly for the next delivery; `None` when nothing arrived.
    async fn next(&self) -> Result<Option<Delivery>, QueueError>;

    /// Puts the event back for another attempt.
    async fn redeliver(&self, delivery: Delivery) -> Result<(), QueueError>;

    /// Parks an event that will not be retried.
    async fn dead_letter(&self, delivery: Delivery, reason: &str) -> Result<(), QueueError>;
}
