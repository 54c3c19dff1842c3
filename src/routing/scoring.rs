//! Scoring functions for model selection

use super::classifier::TaskCategory;
use super::health::ModelHealth;
use serde::{Deserialize, Serialize};

/// Uptime dominates availability; latency and queue depth split the rest.
const UPTIME_SHARE: f64 = 0.6;
const LATENCY_SHARE: f64 = 0.2;
const QUEUE_SHARE: f64 = 0.2;

/// Tolerance for comparing weight sums and final scores.
pub(crate) const SCORE_EPSILON: f64 = 1e-9;

/// Weights combining the three sub-scores into a final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub quality: f64,
    pub cost: f64,
    pub availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality: 0.4,
            cost: 0.3,
            availability: 0.3,
        }
    }
}

impl ScoringWeights {
    /// Validate that weights are non-negative and sum to 1
    pub fn validate(&self) -> Result<(), String> {
        for (name, weight) in [
            ("quality", self.quality),
            ("cost", self.cost),
            ("availability", self.availability),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!(
                    "Scoring weight '{}' must be non-negative, got {}",
                    name, weight
                ));
            }
        }
        let sum = self.quality + self.cost + self.availability;
        if (sum - 1.0).abs() > 1e-6 {
            Err(format!("Scoring weights must sum to 1.0, got {}", sum))
        } else {
            Ok(())
        }
    }
}

/// Where latency and queue depth start to hurt availability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityThresholds {
    /// Latency above this is penalized; twice this scores zero
    pub latency_ms: f64,
    /// Queue depth above this is penalized; twice this scores zero
    pub queue_depth: u32,
    /// Availability assumed for a model with no reported health
    pub missing_metrics_score: f64,
}

impl Default for AvailabilityThresholds {
    fn default() -> Self {
        Self {
            latency_ms: 2000.0,
            queue_depth: 10,
            missing_metrics_score: 0.5,
        }
    }
}

impl AvailabilityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !self.latency_ms.is_finite() || self.latency_ms <= 0.0 {
            return Err(format!(
                "latency threshold must be positive, got {}",
                self.latency_ms
            ));
        }
        if !(0.0..=1.0).contains(&self.missing_metrics_score) {
            return Err(format!(
                "missing_metrics_score must be within [0, 1], got {}",
                self.missing_metrics_score
            ));
        }
        Ok(())
    }
}

/// Sub-scores and weighted total for one candidate.
///
/// Sub-scores are in [0, 1]; `final_score` is exactly their weighted sum, so
/// it stays in [0, 1] for weights that pass [`ScoringWeights::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub quality: f64,
    pub cost: f64,
    pub availability: f64,
    #[serde(rename = "final")]
    pub final_score: f64,
}

impl ModelScores {
    pub fn new(quality: f64, cost: f64, availability: f64, weights: &ScoringWeights) -> Self {
        let final_score = weights.quality * quality
            + weights.cost * cost
            + weights.availability * availability;
        Self {
            quality,
            cost,
            availability,
            final_score,
        }
    }
}

/// Base quality plus `boost` per detected category the model is strong at.
pub fn quality_score(
    base_quality: f64,
    strengths: &[TaskCategory],
    detected: &[TaskCategory],
    boost: f64,
) -> f64 {
    let matches = detected.iter().filter(|c| strengths.contains(c)).count();
    (base_quality + boost * matches as f64).clamp(0.0, 1.0)
}

/// Cheapest-relative cost score: the priciest candidate scores 0.
///
/// When every candidate is free all score 1.
pub fn cost_score(price: f64, max_price: f64) -> f64 {
    if max_price <= 0.0 {
        return 1.0;
    }
    (1.0 - price / max_price).clamp(0.0, 1.0)
}

/// Availability from live health, or the neutral default when missing.
pub fn availability_score(
    health: Option<&ModelHealth>,
    thresholds: &AvailabilityThresholds,
) -> f64 {
    let Some(health) = health else {
        return thresholds.missing_metrics_score;
    };

    let uptime = if health.uptime_ratio.is_nan() {
        0.0
    } else {
        health.uptime_ratio.clamp(0.0, 1.0)
    };
    let latency = linear_penalty(health.current_latency_ms, thresholds.latency_ms);
    let queue = linear_penalty(health.queue_depth as f64, thresholds.queue_depth as f64);

    (UPTIME_SHARE * uptime + LATENCY_SHARE * latency + QUEUE_SHARE * queue).clamp(0.0, 1.0)
}

/// 1 up to `threshold`, falling linearly to 0 at twice the threshold.
fn linear_penalty(value: f64, threshold: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    if value <= threshold {
        return 1.0;
    }
    if threshold <= 0.0 {
        return 0.0;
    }
    (1.0 - (value - threshold) / threshold).clamp(0.0, 1.0)
}
