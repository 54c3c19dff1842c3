//! Route command handler

use super::output::{format_decision_json, format_decision_table};
use super::RouteArgs;
use crate::routing::{ModelRouter, RoutingContext, SystemMetrics};

/// Make one routing decision locally for `switchyard route`.
pub fn handle_route(
    args: &RouteArgs,
    router: &ModelRouter,
) -> Result<String, Box<dyn std::error::Error>> {
    let metrics = match &args.metrics {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Some(serde_json::from_str::<SystemMetrics>(&raw)?)
        }
        None => None,
    };

    let mut ctx = RoutingContext::from_untrusted(&args.caller, &args.tier, args.prompt.as_str())?;
    if let Some(tokens) = args.tokens {
        ctx = ctx.with_token_estimate(tokens);
    }

    let decision = router.route_to_model(&ctx, metrics.as_ref())?;
    if args.json {
        Ok(format_decision_json(&decision)?)
    } else {
        Ok(format_decision_table(&decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(prompt: &str, tier: &str) -> RouteArgs {
        RouteArgs {
            prompt: prompt.to_string(),
            tier: tier.to_string(),
            caller: "cli".to_string(),
            tokens: None,
            metrics: None,
            json: true,
            config: PathBuf::from("switchyard.toml"),
        }
    }

    #[test]
    fn test_route_json_output() {
        let output = handle_route(&args("Hello", "free"), &ModelRouter::builtin()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["selected_model"], "gpt-4o-mini");
        assert!(parsed["scores"]["final"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_route_reads_metrics_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            r#"{"gpt-4o-mini": {"uptime_ratio": 0.0, "current_latency_ms": 9000.0, "queue_depth": 99}}"#,
        )
        .unwrap();

        let mut route_args = args("Hello", "free");
        route_args.metrics = Some(temp.path().to_path_buf());
        let output = handle_route(&route_args, &ModelRouter::builtin()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["selected_model"], "claude-3-haiku");
    }

    #[test]
    fn test_route_rejects_bad_caller() {
        let mut route_args = args("Hello", "free");
        route_args.caller = "has space".to_string();
        assert!(handle_route(&route_args, &ModelRouter::builtin()).is_err());
    }
}
