//! Model profiles and tier eligibility

use super::classifier::TaskCategory;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static facts about a routable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub provider: String,
    /// Baseline quality rating in [0, 1]
    pub base_quality: f64,
    /// Blended USD price per 1K tokens
    pub price_per_1k_tokens: f64,
    pub context_window: u32,
    /// Task categories this model gets a quality boost for
    #[serde(default)]
    pub strengths: Vec<TaskCategory>,
    /// Static tie-break order, lower wins
    #[serde(default)]
    pub priority: u32,
}

impl ModelProfile {
    pub fn new(
        id: &str,
        provider: &str,
        base_quality: f64,
        price_per_1k_tokens: f64,
        context_window: u32,
        priority: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            provider: provider.to_string(),
            base_quality,
            price_per_1k_tokens,
            context_window,
            strengths: Vec::new(),
            priority,
        }
    }

    pub fn with_strengths(mut self, strengths: &[TaskCategory]) -> Self {
        self.strengths = strengths.to_vec();
        self
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("model id cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.base_quality) {
            return Err(format!(
                "model '{}': base_quality must be within [0, 1], got {}",
                self.id, self.base_quality
            ));
        }
        if !self.price_per_1k_tokens.is_finite() || self.price_per_1k_tokens < 0.0 {
            return Err(format!(
                "model '{}': price_per_1k_tokens must be non-negative, got {}",
                self.id, self.price_per_1k_tokens
            ));
        }
        Ok(())
    }
}

/// All models the router may pick from.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelProfile>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelProfile>) -> Self {
        Self { models }
    }

    /// The models the platform ships with.
    pub fn builtin() -> Self {
        use TaskCategory::*;

        Self::new(vec![
            ModelProfile::new("gpt-4o-mini", "openai", 0.72, 0.0004, 128_000, 1),
            ModelProfile::new("claude-3-haiku", "anthropic", 0.70, 0.0007, 200_000, 2)
                .with_strengths(&[Summarization]),
            ModelProfile::new("gemini-1.5-flash", "google", 0.74, 0.0009, 1_000_000, 3)
                .with_strengths(&[Summarization]),
            ModelProfile::new("gpt-4o", "openai", 0.90, 0.0075, 128_000, 4)
                .with_strengths(&[Code, Reasoning]),
            ModelProfile::new("claude-3-5-sonnet", "anthropic", 0.92, 0.009, 200_000, 5)
                .with_strengths(&[Code, Writing]),
            ModelProfile::new("claude-3-opus", "anthropic", 0.95, 0.045, 200_000, 6)
                .with_strengths(&[Reasoning, Writing]),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn models(&self) -> &[ModelProfile] {
        &self.models
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for model in &self.models {
            model.validate()?;
            if !seen.insert(model.id.as_str()) {
                return Err(format!("model '{}' is defined twice", model.id));
            }
        }
        Ok(())
    }
}

/// Tier to allowed model ids.
#[derive(Debug, Clone)]
pub struct TierModelTable {
    allowed: HashMap<Tier, Vec<String>>,
}

impl TierModelTable {
    pub fn new(allowed: HashMap<Tier, Vec<String>>) -> Self {
        Self { allowed }
    }

    /// Free gets the two cheapest models; each tier adds to the one below.
    pub fn builtin() -> Self {
        let free = vec!["gpt-4o-mini", "claude-3-haiku"];
        let pro = [free.clone(), vec!["gemini-1.5-flash", "gpt-4o"]].concat();
        let business = [pro.clone(), vec!["claude-3-5-sonnet"]].concat();
        let enterprise = [business.clone(), vec!["claude-3-opus"]].concat();

        let owned = |ids: Vec<&str>| ids.into_iter().map(String::from).collect::<Vec<_>>();
        Self::new(HashMap::from([
            (Tier::Free, owned(free)),
            (Tier::Pro, owned(pro)),
            (Tier::Business, owned(business)),
            (Tier::Enterprise, owned(enterprise)),
        ]))
    }

    /// Allowed model ids for a tier; empty if the tier has no entry.
    pub fn models_for(&self, tier: Tier) -> &[String] {
        self.allowed.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every tier must allow at least one model, and only catalogued ones.
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<(), String> {
        for tier in Tier::ALL {
            let models = self.models_for(tier);
            if models.is_empty() {
                return Err(format!("tier '{}' has no eligible models", tier));
            }
            if let Some(unknown) = models.iter().find(|id| catalog.get(id).is_none()) {
                return Err(format!(
                    "tier '{}' references unknown model '{}'",
                    tier, unknown
                ));
            }
        }
        Ok(())
    }
}
