//! Property tests for scoring and ranking invariants.

use proptest::prelude::*;
use switchyard::routing::scoring::{availability_score, cost_score, quality_score};
use switchyard::routing::{
    estimate_tokens, AvailabilityThresholds, ModelHealth, ModelRouter, RoutingContext,
    ScoringWeights, SystemMetrics, TaskCategory,
};
use switchyard::tier::Tier;

fn health() -> impl Strategy<Value = ModelHealth> {
    (0.0f64..=1.0, 0.0f64..20_000.0, 0u32..200).prop_map(|(uptime, latency, queue)| ModelHealth {
        uptime_ratio: uptime,
        current_latency_ms: latency,
        queue_depth: queue,
    })
}

fn weights() -> impl Strategy<Value = ScoringWeights> {
    (0.0f64..=1.0, 0.0f64..=1.0).prop_map(|(a, b)| {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        ScoringWeights {
            quality: lo,
            cost: hi - lo,
            availability: 1.0 - hi,
        }
    })
}

proptest! {
    #[test]
    fn availability_is_normalized(h in health()) {
        let score = availability_score(Some(&h), &AvailabilityThresholds::default());
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn higher_latency_never_helps(h in health(), extra in 0.0f64..10_000.0) {
        let thresholds = AvailabilityThresholds::default();
        let slower = ModelHealth { current_latency_ms: h.current_latency_ms + extra, ..h };
        prop_assert!(availability_score(Some(&slower), &thresholds) <= availability_score(Some(&h), &thresholds) + 1e-12);
    }

    #[test]
    fn cost_is_normalized_and_cheaper_is_better(a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let max = a.max(b);
        let (ca, cb) = (cost_score(a, max), cost_score(b, max));
        prop_assert!((0.0..=1.0).contains(&ca));
        prop_assert!((0.0..=1.0).contains(&cb));
        if a < b {
            prop_assert!(ca >= cb);
        }
    }

    #[test]
    fn quality_is_capped(base in 0.0f64..=1.0, boost in 0.0f64..1.0) {
        let all = [TaskCategory::Code, TaskCategory::Reasoning, TaskCategory::Writing];
        let q = quality_score(base, &all, &all, boost);
        prop_assert!((0.0..=1.0).contains(&q));
        prop_assert!(q >= base);
    }

    #[test]
    fn routed_final_is_the_weighted_sum(
        w in weights(),
        mini in proptest::option::of(health()),
        haiku in proptest::option::of(health()),
        prompt in "[a-z ]{0,200}",
    ) {
        let mut metrics = SystemMetrics::new();
        if let Some(h) = mini {
            metrics.insert("gpt-4o-mini", h);
        }
        if let Some(h) = haiku {
            metrics.insert("claude-3-haiku", h);
        }
        let router = ModelRouter::builtin().with_weights(w).unwrap();
        let ctx = RoutingContext::new("prop-user", Tier::Free, prompt).unwrap();
        let decision = router.route_to_model(&ctx, Some(&metrics)).unwrap();

        let s = decision.scores;
        let expected = w.quality * s.quality + w.cost * s.cost + w.availability * s.availability;
        prop_assert!((s.final_score - expected).abs() < 1e-9);
        prop_assert!(router.tiers().models_for(Tier::Free).contains(&decision.selected_model));
        prop_assert!(decision.fallbacks.len() <= 3);
    }

    #[test]
    fn fallbacks_exclude_winner_and_fit_the_tier(prompt in "[a-zA-Z ]{0,300}", tier_idx in 0usize..4) {
        let tier = Tier::ALL[tier_idx];
        let router = ModelRouter::builtin();
        let ctx = RoutingContext::new("prop-user", tier, prompt).unwrap();
        let decision = router.route_to_model(&ctx, None).unwrap();
        prop_assert!(!decision.fallbacks.contains(&decision.selected_model));
        prop_assert!(decision.fallbacks.len() <= router.tiers().models_for(tier).len() - 1);
    }

    #[test]
    fn token_estimate_is_monotonic(words in 0usize..2_000, more in 0usize..500) {
        let short = "w ".repeat(words);
        let long = "w ".repeat(words + more);
        prop_assert!(estimate_tokens(&short) <= estimate_tokens(&long));
        prop_assert_eq!(estimate_tokens(&short) as usize, (words * 4).div_ceil(3));
    }
}
