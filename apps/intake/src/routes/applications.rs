use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::models::application::ApplicationRecord;
use crate::state::AppState;

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationRecord>, AppError> {
    state
        .store
        .get(&application_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))
}
