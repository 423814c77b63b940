//! Image submission endpoints

use axum::extract::State;
use tracing::info;

use super::state::AppState;
use super::types::images::SERVICE_MESSAGE;
use super::types::{ApiError, Json, MessageResponse, ProcessImageRequest, ProcessImageResponse};

/// `GET /`
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: SERVICE_MESSAGE.to_string(),
    })
}

/// `POST /process-images` - queue an image and return immediately
pub async fn process_images(
    State(state): State<AppState>,
    Json(request): Json<ProcessImageRequest>,
) -> Result<Json<ProcessImageResponse>, ApiError> {
    let image_url = request.validate()?.to_string();

    let job_id = state.queue.enqueue(image_url.clone(), request.result_id)?;

    info!(
        job_id = %job_id,
        result_id = request.result_id,
        image_url = %image_url,
        "Queued image for processing"
    );

    Ok(Json(ProcessImageResponse::queued(image_url)))
}
