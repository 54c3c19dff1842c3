//! Health check endpoint handler.

use crate::api::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while running on the memory fallback
    pub status: String,
    pub uptime_seconds: u64,
    pub storage: StorageStatus,
    pub models: usize,
}

/// Bucket store status.
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageStatus {
    pub backend: String,
    pub degraded: bool,
}

/// GET /health - Return system health status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.controller.store();
    let degraded = store.is_degraded();

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        uptime_seconds: state.metrics_collector.uptime_seconds(),
        storage: StorageStatus {
            backend: store.name().to_string(),
            degraded,
        },
        models: state.router.catalog().models().len(),
    })
}
