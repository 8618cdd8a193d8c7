use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::events::push::PushEnvelope;
use crate::pipeline::PipelineErrorReport;
use crate::state::AppState;

/// POST /events/pubsub
///
/// Runs the pipeline inline. Retryable failures answer 503 so the push
/// subscription redelivers; terminal failures are acknowledged with 200 and
/// an error body.
pub async fn handle_pubsub_push(
    State(state): State<AppState>,
    Json(envelope): Json<PushEnvelope>,
) -> Result<Response, AppError> {
    debug!(
        message_id = envelope.message.message_id.as_deref().unwrap_or("-"),
        subscription = envelope.subscription.as_deref().unwrap_or("-"),
        "Received push delivery"
    );
    let event = envelope.into_event()?;

    match state.pipeline.process(&event).await {
        Ok(processed) => Ok((StatusCode::OK, Json(processed)).into_response()),
        Err(e) if e.is_retryable() => Err(AppError::ServiceUnavailable(e.to_string())),
        Err(e) => {
            warn!(event = %e.event_ref, kind = %e.kind, "Dropping event: {e}");
            let report = PipelineErrorReport::from(&e);
            Ok((StatusCode::OK, Json(json!({ "error": report }))).into_response())
        }
    }
}
