use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{Delivery, EventSource, QueueError};
use crate::models::application::DocumentEvent;

/// BLPOP wait per poll; bounds how long shutdown or a reconnect can lag.
const POLL_TIMEOUT_SECS: u64 = 5;

/// Entry written to the dead-letter list.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeadLetter {
    pub delivery: Delivery,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Work queue on a Redis list: producers `RPUSH`, the worker `BLPOP`s.
/// Dead letters go to `<key>:dead`.
pub struct RedisEventQueue {
    client: redis::Client,
    key: String,
    /// Dedicated connection for blocking pops, opened on first use.
    consumer: Mutex<Option<MultiplexedConnection>>,
}

impl RedisEventQueue {
    pub fn new(client: redis::Client, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
            consumer: Mutex::new(None),
        }
    }

    pub fn dead_letter_key(&self) -> String {
        format!("{}:dead", self.key)
    }

    /// Enqueues a freshly uploaded document.
    pub async fn publish(&self, event: DocumentEvent) -> Result<(), QueueError> {
        let event_ref = event.reference();
        self.push(&self.key, serde_json::to_string(&Delivery::first(event))?)
            .await?;
        info!(event = %event_ref, queue = %self.key, "Published document event");
        Ok(())
    }

    async fn push(&self, key: &str, payload: String) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("RPUSH")
            .arg(key)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Dead-letter entry for a payload that does not parse as a `Delivery`.
fn unreadable_entry(
    payload: &str,
    err: &serde_json::Error,
    failed_at: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "raw": payload,
        "reason": format!("unreadable payload: {err}"),
        "failed_at": failed_at,
    })
}

#[async_trait]
impl EventSource for RedisEventQueue {
    async fn next(&self) -> Result<Option<Delivery>, QueueError> {
        let mut guard = self.consumer.lock().await;
        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.client.get_multiplexed_async_connection().await?,
        };

        // On error the connection is dropped so the next poll reconnects
        let popped = redis::cmd("BLPOP")
            .arg(&self.key)
            .arg(POLL_TIMEOUT_SECS)
            .query_async::<_, Option<(String, String)>>(&mut conn)
            .await?;
        *guard = Some(conn);
        drop(guard);

        let Some((_, payload)) = popped else {
            return Ok(None);
        };
        match serde_json::from_str::<Delivery>(&payload) {
            Ok(delivery) => Ok(Some(delivery)),
            Err(e) => {
                warn!("Dropping unreadable queue payload to dead letters: {e}");
                let entry = unreadable_entry(&payload, &e, Utc::now());
                self.push(&self.dead_letter_key(), entry.to_string()).await?;
                // Parked, so the caller polls again straight away
                Ok(None)
            }
        }
    }

    async fn redeliver(&self, delivery: Delivery) -> Result<(), QueueError> {
        let next = Delivery {
            attempt: delivery.attempt + 1,
            ..delivery
        };
        self.push(&self.key, serde_json::to_string(&next)?).await
    }

    async fn dead_letter(&self, delivery: Delivery, reason: &str) -> Result<(), QueueError> {
        let entry = DeadLetter {
            delivery,
            reason: reason.to_string(),
            failed_at: Utc::now(),
        };
        self.push(&self.dead_letter_key(), serde_json::to_string(&entry)?)
            .await
    }
}
