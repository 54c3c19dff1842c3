//! Routing and metrics feed handlers.

use super::admission::{denied_response, rate_limit_headers};
use super::{ApiError, AppState, RouteRequest};
use crate::routing::{RoutingContext, SystemMetrics};
use crate::tier::Endpoint;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// POST /v1/route - admission first, then model selection.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;

    let request_id = request
        .request_id
        .clone()
        .unwrap_or_else(|| crate::logging::request_id_from_headers(&headers));
    let mut ctx = RoutingContext::from_untrusted(&request.caller_id, &request.tier, request.prompt)
        .map_err(|e| {
            crate::metrics::record_routing_error(e.kind());
            ApiError::from(e)
        })?
        .with_request_id(request_id);
    if let Some(tokens) = request.estimated_tokens {
        ctx = ctx.with_token_estimate(tokens);
    }

    let endpoint = request
        .endpoint
        .as_deref()
        .map(Endpoint::from_untrusted)
        .unwrap_or(Endpoint::ChatSend);
    let admission = state
        .controller
        .consume_for(endpoint, ctx.caller_id(), ctx.tier())
        .await?;
    if !admission.allowed {
        return Ok(denied_response(&admission));
    }

    let snapshot = state.system_metrics();
    let metrics = request.metrics.as_ref().or(snapshot.as_deref());
    let decision = state.router.route_to_model(&ctx, metrics)?;

    Ok((rate_limit_headers(&admission), Json(decision)).into_response())
}

/// PUT /v1/system-metrics - replace the health snapshot.
pub async fn update_system_metrics(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SystemMetrics>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(metrics) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;
    tracing::debug!(models = metrics.len(), "System metrics snapshot updated");
    state.set_system_metrics(metrics);
    Ok(StatusCode::NO_CONTENT)
}
