//! Policy table endpoint handler.

use super::{AppState, PoliciesResponse, PolicyEntry};
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /v1/policies
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<PoliciesResponse> {
    let table = state.controller.policies();
    let policies = table
        .entries()
        .into_iter()
        .map(|(endpoint, tier, policy)| PolicyEntry::new(endpoint, tier, policy))
        .collect();

    Json(PoliciesResponse {
        policies,
        default_policy: table.default_policy(),
    })
}
