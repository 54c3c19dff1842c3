//! Model routing
//!
//! Picks which backend model serves an admitted request. Every model the
//! caller's tier allows is scored on quality, cost and availability; the
//! weighted total decides the winner and the runners-up become the ordered
//! fallback chain.
//!
//! The router never does I/O. Live health arrives as a [`SystemMetrics`]
//! snapshot and may be absent, in which case availability is neutral.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

pub mod catalog;
pub mod classifier;
pub mod context;
pub mod decision;
pub mod error;
pub mod health;
pub mod scoring;

pub use catalog::{ModelCatalog, ModelProfile, TierModelTable};
pub use classifier::{KeywordClassifier, TaskCategory, TaskClassifier};
pub use context::{estimate_tokens, RoutingContext};
pub use decision::RoutingDecision;
pub use error::RoutingError;
pub use health::{ModelHealth, SystemMetrics};
pub use scoring::{AvailabilityThresholds, ModelScores, ScoringWeights};

use scoring::SCORE_EPSILON;

/// Quality added per detected category a model is strong at.
pub const DEFAULT_QUALITY_BOOST: f64 = 0.1;

/// Upper bound on the fallback chain length.
pub const MAX_FALLBACKS: usize = 3;

/// Selects a model for each request
pub struct ModelRouter {
    catalog: ModelCatalog,
    tiers: TierModelTable,
    weights: ScoringWeights,
    thresholds: AvailabilityThresholds,
    quality_boost: f64,
    max_fallbacks: usize,
    classifier: Arc<dyn TaskClassifier>,
}

struct Candidate<'a> {
    model: &'a ModelProfile,
    scores: ModelScores,
    has_health: bool,
}

impl ModelRouter {
    /// Router over the built-in catalog and tier table with default scoring.
    pub fn builtin() -> Self {
        Self::unchecked(ModelCatalog::builtin(), TierModelTable::builtin())
    }

    /// Router over a custom catalog. Fails if any tier is left without
    /// models or references a model the catalog lacks.
    pub fn new(catalog: ModelCatalog, tiers: TierModelTable) -> Result<Self, RoutingError> {
        catalog.validate().map_err(RoutingError::Misconfigured)?;
        tiers.validate(&catalog).map_err(RoutingError::Misconfigured)?;
        Ok(Self::unchecked(catalog, tiers))
    }

    /// Build a router from the `[routing]` config section.
    pub fn from_config(config: &crate::config::RoutingConfig) -> Result<Self, RoutingError> {
        let catalog = if config.models.is_empty() {
            ModelCatalog::builtin()
        } else {
            ModelCatalog::new(config.models.clone())
        };
        let tiers = if config.tiers.is_empty() {
            TierModelTable::builtin()
        } else {
            TierModelTable::new(config.tiers.clone())
        };

        config
            .availability
            .validate()
            .map_err(RoutingError::Misconfigured)?;

        Ok(Self::new(catalog, tiers)?
            .with_weights(config.weights)?
            .with_thresholds(config.availability)
            .with_quality_boost(config.quality_boost)
            .with_max_fallbacks(config.max_fallbacks))
    }

    fn unchecked(catalog: ModelCatalog, tiers: TierModelTable) -> Self {
        Self {
            catalog,
            tiers,
            weights: ScoringWeights::default(),
            thresholds: AvailabilityThresholds::default(),
            quality_boost: DEFAULT_QUALITY_BOOST,
            max_fallbacks: MAX_FALLBACKS,
            classifier: Arc::new(KeywordClassifier::new()),
        }
    }

    /// Rejects weights that are negative or do not sum to 1.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Result<Self, RoutingError> {
        weights.validate().map_err(RoutingError::Misconfigured)?;
        self.weights = weights;
        Ok(self)
    }

    pub fn with_thresholds(mut self, thresholds: AvailabilityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_quality_boost(mut self, boost: f64) -> Self {
        self.quality_boost = boost.max(0.0);
        self
    }

    /// Clamped to 1..=3.
    pub fn with_max_fallbacks(mut self, max_fallbacks: usize) -> Self {
        self.max_fallbacks = max_fallbacks.clamp(1, MAX_FALLBACKS);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TaskClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn tiers(&self) -> &TierModelTable {
        &self.tiers
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Pick the best model for `ctx` and rank the fallbacks.
    ///
    /// Only fails when the tier has no eligible models. Missing or partial
    /// metrics and oversized prompts still produce a decision.
    pub fn route_to_model(
        &self,
        ctx: &RoutingContext,
        metrics: Option<&SystemMetrics>,
    ) -> Result<RoutingDecision, RoutingError> {
        let started = Instant::now();
        let tier = ctx.tier();

        let allowed: Vec<&ModelProfile> = self
            .tiers
            .models_for(tier)
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .collect();
        if allowed.is_empty() {
            crate::metrics::record_routing_error("no_eligible_models");
            tracing::error!(tier = %tier, "No eligible models for tier");
            return Err(RoutingError::NoEligibleModels { tier });
        }

        let tokens = ctx.estimated_tokens();
        let fitting: Vec<&ModelProfile> = allowed
            .iter()
            .copied()
            .filter(|m| m.context_window >= tokens)
            .collect();
        let eligible = if fitting.is_empty() {
            tracing::warn!(
                tier = %tier,
                estimated_tokens = tokens,
                "Prompt exceeds every eligible context window, scoring all"
            );
            allowed
        } else {
            fitting
        };

        let detected = self.classifier.classify(ctx.prompt());
        let max_price = eligible
            .iter()
            .map(|m| m.price_per_1k_tokens)
            .fold(0.0, f64::max);

        let mut ranked: Vec<Candidate<'_>> = eligible
            .into_iter()
            .map(|model| {
                let health = metrics.and_then(|m| m.get(&model.id));
                let scores = ModelScores::new(
                    scoring::quality_score(
                        model.base_quality,
                        &model.strengths,
                        &detected,
                        self.quality_boost,
                    ),
                    scoring::cost_score(model.price_per_1k_tokens, max_price),
                    scoring::availability_score(health, &self.thresholds),
                    &self.weights,
                );
                Candidate {
                    model,
                    scores,
                    has_health: health.is_some(),
                }
            })
            .collect();
        ranked.sort_by(rank);

        let Some((winner, rest)) = ranked.split_first() else {
            return Err(RoutingError::NoEligibleModels { tier });
        };
        let fallbacks: Vec<String> = rest
            .iter()
            .take(self.max_fallbacks)
            .map(|c| c.model.id.clone())
            .collect();
        let reasoning = self.explain(winner, rest.first(), ranked.len(), tier, &detected);

        let elapsed = started.elapsed();
        crate::metrics::record_routing(&winner.model.id, tier, elapsed);
        tracing::debug!(
            request_id = %ctx.request_id(),
            caller_id = %ctx.caller_id(),
            tier = %tier,
            model = %winner.model.id,
            final_score = winner.scores.final_score,
            fallbacks = ?fallbacks,
            elapsed_us = elapsed.as_micros() as u64,
            "Routing decision"
        );

        Ok(RoutingDecision {
            request_id: ctx.request_id().to_string(),
            selected_model: winner.model.id.clone(),
            provider: winner.model.provider.clone(),
            scores: winner.scores,
            fallbacks,
            reasoning,
            tier,
            estimated_tokens: tokens,
        })
    }

    /// Name the factor that contributed most to the win.
    fn explain(
        &self,
        winner: &Candidate<'_>,
        runner_up: Option<&Candidate<'_>>,
        eligible: usize,
        tier: crate::tier::Tier,
        detected: &[TaskCategory],
    ) -> String {
        let w = &self.weights;
        let s = &winner.scores;
        // Against a runner-up the deciding factor is the largest weighted
        // margin; alone, it is the largest weighted contribution.
        let (base_q, base_c, base_a) = match runner_up {
            Some(r) => (r.scores.quality, r.scores.cost, r.scores.availability),
            None => (0.0, 0.0, 0.0),
        };
        let factors = [
            ("quality", w.quality * (s.quality - base_q)),
            ("cost", w.cost * (s.cost - base_c)),
            ("availability", w.availability * (s.availability - base_a)),
        ];
        let (factor, margin) = factors
            .iter()
            .copied()
            .fold(factors[0], |best, f| if f.1 > best.1 { f } else { best });

        let mut reasoning = if runner_up.is_some() && margin <= SCORE_EPSILON {
            format!(
                "{} selected by tie-break (final {:.3}) among {} eligible models for {} tier",
                winner.model.id, s.final_score, eligible, tier
            )
        } else {
            format!(
                "{} selected for {} (final {:.3}) among {} eligible models for {} tier",
                winner.model.id, factor, s.final_score, eligible, tier
            )
        };
        if !detected.is_empty() {
            let names: Vec<String> = detected.iter().map(ToString::to_string).collect();
            reasoning.push_str(&format!("; {} task detected", names.join("/")));
        }
        if !winner.has_health {
            reasoning.push_str("; no live metrics, availability assumed neutral");
        }
        reasoning
    }
}

/// Best first: final score, then availability, then static priority, then id.
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    desc(a.scores.final_score, b.scores.final_score)
        .then_with(|| desc(a.scores.availability, b.scores.availability))
        .then_with(|| a.model.priority.cmp(&b.model.priority))
        .then_with(|| a.model.id.cmp(&b.model.id))
}

/// Higher first. Scores are compared on an epsilon grid so the order stays
/// total: two scores are equal only when they round to the same step.
fn desc(a: f64, b: f64) -> Ordering {
    score_step(b).cmp(&score_step(a))
}

fn score_step(score: f64) -> i64 {
    // NaN maps to 0, out-of-range values saturate
    (score / SCORE_EPSILON).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Tier;
    use std::collections::HashMap;

    fn ctx(tier: Tier, prompt: &str) -> RoutingContext {
        RoutingContext::new("user-1", tier, prompt).unwrap()
    }

    fn healthy() -> ModelHealth {
        ModelHealth {
            uptime_ratio: 1.0,
            current_latency_ms: 200.0,
            queue_depth: 0,
        }
    }

    #[test]
    fn test_free_hello_picks_cheap_model() {
        let router = ModelRouter::builtin();
        let decision = router.route_to_model(&ctx(Tier::Free, "Hello"), None).unwrap();

        assert!(["gpt-4o-mini", "claude-3-haiku"].contains(&decision.selected_model.as_str()));
        assert_eq!(decision.selected_model, "gpt-4o-mini");
        assert_eq!(decision.provider, "openai");
        assert_eq!(decision.fallbacks, vec!["claude-3-haiku".to_string()]);
        assert!(!decision.reasoning.is_empty());
        assert_eq!(decision.estimated_tokens, 2);
    }

    #[test]
    fn test_final_is_weighted_sum() {
        let router = ModelRouter::builtin();
        for tier in Tier::ALL {
            let d = router
                .route_to_model(&ctx(tier, "Explain this Python stack trace"), None)
                .unwrap();
            let s = d.scores;
            let expected = 0.4 * s.quality + 0.3 * s.cost + 0.3 * s.availability;
            assert!((s.final_score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_selection_stays_within_tier() {
        let router = ModelRouter::builtin();
        for tier in Tier::ALL {
            let d = router
                .route_to_model(&ctx(tier, "Write an essay on rust"), None)
                .unwrap();
            let allowed = router.tiers().models_for(tier);
            assert!(allowed.contains(&d.selected_model));
            assert!(d.fallbacks.iter().all(|f| allowed.contains(f)));
            assert!(!d.fallbacks.contains(&d.selected_model));
        }
    }

    #[test]
    fn test_fallbacks_are_bounded_and_ordered() {
        let router = ModelRouter::builtin();
        let d = router
            .route_to_model(&ctx(Tier::Enterprise, "Hello"), None)
            .unwrap();
        assert_eq!(d.fallbacks.len(), MAX_FALLBACKS);

        let router = ModelRouter::builtin().with_max_fallbacks(0);
        let d = router.route_to_model(&ctx(Tier::Pro, "Hello"), None).unwrap();
        assert_eq!(d.fallbacks.len(), 1);
    }

    #[test]
    fn test_strength_boost_changes_winner() {
        let router = ModelRouter::builtin()
            .with_weights(ScoringWeights {
                quality: 1.0,
                cost: 0.0,
                availability: 0.0,
            })
            .unwrap();
        let plain = router
            .route_to_model(&ctx(Tier::Business, "Hello"), None)
            .unwrap();
        assert_eq!(plain.selected_model, "claude-3-5-sonnet");

        let reasoning = router
            .route_to_model(&ctx(Tier::Business, "Solve this equation"), None)
            .unwrap();
        assert_eq!(reasoning.selected_model, "gpt-4o");
        assert_eq!(reasoning.scores.quality, 1.0);
        assert!(reasoning.reasoning.contains("selected for quality"));
        assert!(reasoning.reasoning.contains("reasoning task detected"));
    }

    #[test]
    fn test_unhealthy_model_loses() {
        let router = ModelRouter::builtin();
        let metrics = SystemMetrics::new()
            .with_model(
                "gpt-4o-mini",
                ModelHealth {
                    uptime_ratio: 0.1,
                    current_latency_ms: 9000.0,
                    queue_depth: 50,
                },
            )
            .with_model("claude-3-haiku", healthy());
        let d = router
            .route_to_model(&ctx(Tier::Free, "Hello"), Some(&metrics))
            .unwrap();
        assert_eq!(d.selected_model, "claude-3-haiku");
        assert_eq!(d.fallbacks, vec!["gpt-4o-mini".to_string()]);
        assert!(!d.reasoning.contains("no live metrics"));
    }

    #[test]
    fn test_partial_metrics() {
        let router = ModelRouter::builtin();
        let metrics = SystemMetrics::new().with_model("gpt-4o", healthy());
        let d = router
            .route_to_model(&ctx(Tier::Pro, "Hello"), Some(&metrics))
            .unwrap();
        for s in [d.scores.quality, d.scores.cost, d.scores.availability, d.scores.final_score] {
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_oversized_prompt_drops_small_windows() {
        let router = ModelRouter::builtin();
        let context = ctx(Tier::Pro, "Summarize").with_token_estimate(500_000);
        let d = router.route_to_model(&context, None).unwrap();
        assert_eq!(d.selected_model, "gemini-1.5-flash");
        assert!(d.fallbacks.is_empty());

        // Nothing fits: every allowed model is still scored
        let context = ctx(Tier::Free, "Hello").with_token_estimate(u32::MAX);
        let d = router.route_to_model(&context, None).unwrap();
        assert_eq!(d.fallbacks.len(), 1);
    }

    #[test]
    fn test_tie_breaks_by_priority_then_id() {
        let catalog = ModelCatalog::new(vec![
            ModelProfile::new("b-model", "p", 0.8, 0.001, 8000, 1),
            ModelProfile::new("a-model", "p", 0.8, 0.001, 8000, 2),
            ModelProfile::new("c-model", "p", 0.8, 0.001, 8000, 2),
        ]);
        let ids = vec!["a-model".to_string(), "b-model".to_string(), "c-model".to_string()];
        let tiers = TierModelTable::new(Tier::ALL.iter().map(|t| (*t, ids.clone())).collect());
        let router = ModelRouter::new(catalog, tiers).unwrap();

        let d = router.route_to_model(&ctx(Tier::Free, "Hello"), None).unwrap();
        assert_eq!(d.selected_model, "b-model");
        assert_eq!(d.fallbacks, vec!["a-model".to_string(), "c-model".to_string()]);
        assert!(d.reasoning.contains("tie-break"));
    }

    #[test]
    fn test_reported_health_beats_missing_health() {
        // Identical profiles; only reported health differs
        let catalog = ModelCatalog::new(vec![
            ModelProfile::new("cheap", "p", 0.5, 0.0, 8000, 1),
            ModelProfile::new("steady", "p", 0.5, 0.0, 8000, 2),
        ]);
        let ids = vec!["cheap".to_string(), "steady".to_string()];
        let tiers = TierModelTable::new(Tier::ALL.iter().map(|t| (*t, ids.clone())).collect());
        let router = ModelRouter::new(catalog, tiers).unwrap();
        let metrics = SystemMetrics::new().with_model("steady", healthy());

        let d = router
            .route_to_model(&ctx(Tier::Free, "Hello"), Some(&metrics))
            .unwrap();
        assert_eq!(d.selected_model, "steady");
    }

    #[test]
    fn test_new_rejects_empty_tier() {
        let mut tiers = HashMap::new();
        tiers.insert(Tier::Free, vec!["gpt-4o-mini".to_string()]);
        let result = ModelRouter::new(ModelCatalog::builtin(), TierModelTable::new(tiers));
        assert!(matches!(result, Err(RoutingError::Misconfigured(_))));
    }

    #[test]
    fn test_with_weights_rejects_weights_that_do_not_sum_to_one() {
        let result = ModelRouter::builtin().with_weights(ScoringWeights {
            quality: 1.0,
            cost: 1.0,
            availability: 1.0,
        });
        assert!(matches!(result, Err(RoutingError::Misconfigured(_))));

        let result = ModelRouter::builtin().with_weights(ScoringWeights {
            quality: 1.5,
            cost: -0.5,
            availability: 0.0,
        });
        assert!(matches!(result, Err(RoutingError::Misconfigured(_))));
    }

    #[test]
    fn test_score_order_is_total_for_near_ties() {
        let values: Vec<f64> = (0..12).map(|i| 0.5 + i as f64 * 0.4e-9).collect();
        for a in &values {
            for b in &values {
                assert_eq!(desc(*a, *b), desc(*b, *a).reverse());
                for c in &values {
                    if desc(*a, *b) != Ordering::Greater && desc(*b, *c) != Ordering::Greater {
                        assert_ne!(desc(*a, *c), Ordering::Greater);
                    }
                }
            }
        }

        let mut shuffled: Vec<f64> = values.iter().rev().chain(values.iter()).copied().collect();
        shuffled.sort_by(|a, b| desc(*a, *b));
        assert!(shuffled
            .windows(2)
            .all(|w| desc(w[0], w[1]) != Ordering::Greater));
        assert!(score_step(shuffled[0]) >= score_step(shuffled[shuffled.len() - 1]));
    }

    struct AlwaysCode;

    impl TaskClassifier for AlwaysCode {
        fn classify(&self, _prompt: &str) -> Vec<TaskCategory> {
            vec![TaskCategory::Code]
        }
    }

    #[test]
    fn test_custom_classifier_is_used() {
        let router = ModelRouter::builtin().with_classifier(Arc::new(AlwaysCode));
        let d = router.route_to_model(&ctx(Tier::Pro, "Hello"), None).unwrap();
        assert!(d.reasoning.contains("code task detected"));
    }
}
