//! Routing configuration

use crate::routing::{
    AvailabilityThresholds, ModelProfile, ScoringWeights, DEFAULT_QUALITY_BOOST, MAX_FALLBACKS,
};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Routing configuration
///
/// Empty `models` or `tiers` means the built-in catalog or tier table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub weights: ScoringWeights,
    pub availability: AvailabilityThresholds,
    pub quality_boost: f64,
    pub max_fallbacks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelProfile>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub tiers: HashMap<Tier, Vec<String>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            availability: AvailabilityThresholds::default(),
            quality_boost: DEFAULT_QUALITY_BOOST,
            max_fallbacks: MAX_FALLBACKS,
            models: Vec::new(),
            tiers: HashMap::new(),
        }
    }
}
