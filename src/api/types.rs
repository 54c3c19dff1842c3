//! Request and response types for the HTTP API.

use crate::admission::{AdmissionDecision, RateLimitPolicy};
use crate::routing::SystemMetrics;
use crate::tier::{Endpoint, Tier};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/admission/check` and `POST /admin/rate-limits/reset`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionRequest {
    pub endpoint: String,
    pub caller_id: String,
    pub tier: String,
}

/// Admission outcome as returned to callers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdmissionResponse {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
    /// Zero when allowed
    pub retry_after_ms: u64,
}

impl From<&AdmissionDecision> for AdmissionResponse {
    fn from(decision: &AdmissionDecision) -> Self {
        Self {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at_ms: decision.reset_at_ms,
            retry_after_ms: decision.retry_after.as_millis().min(u64::MAX as u128) as u64,
        }
    }
}

/// Body of `POST /v1/route`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRequest {
    pub caller_id: String,
    pub tier: String,
    pub prompt: String,
    /// Endpoint charged for admission, `chat:send` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u32>,
    /// Overrides the last snapshot pushed to `/v1/system-metrics`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SystemMetrics>,
}

/// One row of `GET /v1/policies`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PolicyEntry {
    pub endpoint: Endpoint,
    pub tier: Tier,
    pub max_tokens: f64,
    pub refill_rate_per_second: f64,
    pub refill_interval_ms: u64,
    pub disabled: bool,
}

impl PolicyEntry {
    pub fn new(endpoint: Endpoint, tier: Tier, policy: RateLimitPolicy) -> Self {
        Self {
            endpoint,
            tier,
            max_tokens: policy.max_tokens,
            refill_rate_per_second: policy.refill_rate_per_second,
            refill_interval_ms: policy.refill_interval_ms,
            disabled: policy.is_disabled(),
        }
    }
}

/// Response of `GET /v1/policies`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoliciesResponse {
    pub policies: Vec<PolicyEntry>,
    /// Applied to endpoints without an entry
    pub default_policy: RateLimitPolicy,
}

/// API error response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: &str, r#type: &str, param: Option<&str>, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: r#type.to_string(),
                param: param.map(String::from),
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error", None, "invalid_request_error")
    }

    /// Create a bad request error (400) naming the offending field.
    pub fn invalid_param(param: &str, message: &str) -> Self {
        Self::new(
            message,
            "invalid_request_error",
            Some(param),
            "invalid_request_error",
        )
    }

    /// Create a missing or wrong credentials error (401).
    pub fn unauthorized() -> Self {
        Self::new(
            "Missing or invalid admin token",
            "authentication_error",
            None,
            "unauthorized",
        )
    }

    /// Create a quota exceeded error (429).
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            &format!(
                "Rate limit exceeded, retry after {} seconds",
                retry_after_secs
            ),
            "rate_limit_error",
            None,
            "rate_limited",
        )
    }

    /// Create an internal error (500).
    pub fn internal(message: &str, code: &str) -> Self {
        Self::new(message, "server_error", None, code)
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self::new(message, "server_error", None, "service_unavailable")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("unauthorized") => StatusCode::UNAUTHORIZED,
            Some("rate_limited") => StatusCode::TOO_MANY_REQUESTS,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<crate::admission::AdmissionError> for ApiError {
    fn from(err: crate::admission::AdmissionError) -> Self {
        use crate::admission::AdmissionError;
        match err {
            AdmissionError::InvalidCaller(e) => ApiError::invalid_param("caller_id", &e.to_string()),
            AdmissionError::Contention { .. } => ApiError::service_unavailable(&err.to_string()),
            AdmissionError::Store(e) => {
                tracing::error!(error = %e, "Bucket store failure reached the API");
                ApiError::service_unavailable("Rate limit storage unavailable")
            }
        }
    }
}

impl From<crate::routing::RoutingError> for ApiError {
    fn from(err: crate::routing::RoutingError) -> Self {
        use crate::routing::RoutingError;
        match &err {
            RoutingError::InvalidContext { reason } => ApiError::bad_request(reason),
            RoutingError::NoEligibleModels { .. } | RoutingError::Misconfigured(_) => {
                ApiError::internal(&err.to_string(), err.kind())
            }
        }
    }
}
