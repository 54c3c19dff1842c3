//! Live model health reported by the serving layer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recent health of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelHealth {
    /// Fraction of recent requests that succeeded, in [0, 1]
    pub uptime_ratio: f64,
    pub current_latency_ms: f64,
    pub queue_depth: u32,
}

/// Snapshot of health by model id. Models may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemMetrics {
    models: HashMap<String, ModelHealth>,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model_id: &str, health: ModelHealth) -> Self {
        self.insert(model_id, health);
        self
    }

    pub fn insert(&mut self, model_id: &str, health: ModelHealth) {
        self.models.insert(model_id.to_string(), health);
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelHealth> {
        self.models.get(model_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
