//! Routing output

use super::scoring::ModelScores;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// The router's pick for one request.
///
/// The invocation layer calls `selected_model` and, on a transient failure,
/// walks `fallbacks` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: String,
    pub selected_model: String,
    pub provider: String,
    pub scores: ModelScores,
    /// Next best models by final score, best first, winner excluded
    pub fallbacks: Vec<String>,
    pub reasoning: String,
    /// Tier the decision was made for, after normalization
    pub tier: Tier,
    pub estimated_tokens: u32,
}
