//! Queue inspection endpoint

use axum::extract::State;

use crate::domain::QueueSnapshot;

use super::state::AppState;
use super::types::Json;

/// `GET /queue`
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}
