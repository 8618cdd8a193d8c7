//! Queue consumer. Pulls deliveries from an `EventSource` and runs the
//! pipeline on each, at most `concurrency` at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::{Delivery, EventSource};
use crate::pipeline::{Pipeline, PipelineError, Processed};

/// Pause after a broker error before polling again.
const BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub max_attempts: u32,
}

/// What the worker does with a delivery once the pipeline has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Done,
    Redeliver,
    DeadLetter(String),
}

pub fn disposition(
    result: &Result<Processed, PipelineError>,
    attempt: u32,
    max_attempts: u32,
) -> Disposition {
    match result {
        Ok(_) => Disposition::Done,
        Err(e) if e.is_retryable() && attempt < max_attempts => Disposition::Redeliver,
        Err(e) if e.is_retryable() => {
            Disposition::DeadLetter(format!("gave up after {attempt} attempts: {e}"))
        }
        Err(e) => Disposition::DeadLetter(e.to_string()),
    }
}

/// Runs one delivery through the pipeline and settles it with the source.
pub async fn handle_delivery(
    source: &dyn EventSource,
    pipeline: &Pipeline,
    delivery: Delivery,
    max_attempts: u32,
) -> Disposition {
    let result = pipeline.process(&delivery.event).await;
    let outcome = disposition(&result, delivery.attempt, max_attempts);
    let event_ref = delivery.event.reference();

    let settled = match &outcome {
        Disposition::Done => Ok(()),
        Disposition::Redeliver => {
            warn!(
                event = %event_ref,
                attempt = delivery.attempt,
                "Retryable failure, redelivering"
            );
            source.redeliver(delivery).await
        }
        Disposition::DeadLetter(reason) => {
            error!(event = %event_ref, attempt = delivery.attempt, "Dead-lettering: {reason}");
            source.dead_letter(delivery, reason).await
        }
    };
    if let Err(e) = settled {
        error!(event = %event_ref, "Failed to settle delivery: {e}");
    }
    outcome
}

/// Consumes the source forever.
pub async fn run_worker(source: Arc<dyn EventSource>, pipeline: Arc<Pipeline>, options: WorkerOptions) {
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    info!(
        concurrency = options.concurrency,
        max_attempts = options.max_attempts,
        "Queue worker started"
    );

    loop {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let delivery = match source.next().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(e) => {
                error!("Queue poll failed: {e}");
                drop(permit);
                tokio::time::sleep(BACKOFF).await;
                continue;
            }
        };

        let source = source.clone();
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            handle_delivery(source.as_ref(), &pipeline, delivery, options.max_attempts).await;
            drop(permit);
        });
    }
}
