//! Error types for routing failures

use crate::tier::Tier;
use thiserror::Error;

/// Errors that can occur while picking a model
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The request is structurally unusable (bad caller id, unknown tier)
    #[error("Invalid routing context: {reason}")]
    InvalidContext { reason: String },

    /// The tier table leaves this tier with nothing to route to
    #[error("No eligible models configured for tier '{tier}'")]
    NoEligibleModels { tier: Tier },

    /// Catalog or tier table failed validation
    #[error("Routing table misconfigured: {0}")]
    Misconfigured(String),
}

impl RoutingError {
    /// Short label used for metrics and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingError::InvalidContext { .. } => "invalid_context",
            RoutingError::NoEligibleModels { .. } => "no_eligible_models",
            RoutingError::Misconfigured(_) => "misconfigured",
        }
    }
}

impl From<crate::caller::InvalidCallerId> for RoutingError {
    fn from(err: crate::caller::InvalidCallerId) -> Self {
        RoutingError::InvalidContext {
            reason: err.to_string(),
        }
    }
}
