pub mod applications;
pub mod events;
pub mod health;
pub mod upload;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        // Ingestion
        .route("/upload", post(upload::handle_upload))
        .route("/events/pubsub", post(events::handle_pubsub_push))
        // Read API
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application),
        )
        .with_state(state)
}
