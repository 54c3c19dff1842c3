//! Admission check and operator reset handlers.

use super::{AdmissionRequest, AdmissionResponse, ApiError, AppState};
use crate::admission::AdmissionDecision;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

pub(crate) const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub(crate) const RATE_LIMIT_REMAINING: HeaderName =
    HeaderName::from_static("x-ratelimit-remaining");
pub(crate) const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Quota headers sent with every admission outcome. `Retry-After` only on denial.
pub(crate) fn rate_limit_headers(decision: &AdmissionDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    // Epoch seconds, rounded up so clients never retry early
    let reset_secs = (decision.reset_at_ms.max(0) as u64).div_ceil(1000);
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(reset_secs));
    if !decision.allowed {
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(decision.retry_after_secs()),
        );
    }
    headers
}

/// 429 with quota headers and the error envelope.
pub(crate) fn denied_response(decision: &AdmissionDecision) -> Response {
    (
        rate_limit_headers(decision),
        ApiError::rate_limited(decision.retry_after_secs()),
    )
        .into_response()
}

/// POST /v1/admission/check
pub async fn check(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdmissionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;

    let decision = state
        .controller
        .consume(&request.endpoint, &request.caller_id, &request.tier)
        .await?;

    if !decision.allowed {
        return Ok(denied_response(&decision));
    }
    Ok((
        rate_limit_headers(&decision),
        Json(AdmissionResponse::from(&decision)),
    )
        .into_response())
}

/// POST /admin/rate-limits/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AdmissionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    authorize_admin(&headers, state.config.server.admin_token.as_deref())?;
    let Json(request) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;

    state
        .controller
        .reset(&request.endpoint, &request.caller_id, &request.tier)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Admin routes are open when no token is configured.
fn authorize_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => {
            tracing::warn!("Rejected admin request with missing or invalid token");
            Err(ApiError::unauthorized())
        }
    }
}
