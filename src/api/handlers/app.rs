use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::error::CoreError;
use crate::storage::JobCounts;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Session cache liveness, under the key existing clients expect
    #[serde(rename = "redis")]
    pub cache: bool,
    pub db: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: u64,
    pub files: u64,
    pub jobs: JobCounts,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        cache: state.cache.is_alive().await,
        db: state.db.is_alive(),
    })
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let users = state.db.count_users().map_err(CoreError::from)?;
    let files = state.db.count_nodes().map_err(CoreError::from)?;
    let jobs = state.queue.counts().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count jobs");
        ApiError::internal()
    })?;

    Ok(Json(StatsResponse { users, files, jobs }))
}
