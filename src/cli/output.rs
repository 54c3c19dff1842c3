//! Output formatting helpers for CLI commands

use crate::api::PolicyEntry;
use crate::routing::RoutingDecision;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;
use std::time::Duration;

/// Human form of a window length: "1m", "1h", "90s".
pub fn format_window(ms: u64) -> String {
    let secs = Duration::from_millis(ms).as_secs();
    match secs {
        s if s > 0 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s > 0 && s % 60 == 0 => format!("{}m", s / 60),
        s if s > 0 => format!("{}s", s),
        _ => format!("{}ms", ms),
    }
}

/// Format policies as a table
pub fn format_policies_table(policies: &[PolicyEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Endpoint", "Tier", "Burst", "Refill/s", "Window", "Status"]);

    for p in policies {
        let status = if p.disabled {
            "Disabled".red().to_string()
        } else {
            "Active".green().to_string()
        };
        table.add_row(vec![
            Cell::new(p.endpoint),
            Cell::new(p.tier),
            Cell::new(p.max_tokens),
            Cell::new(format!("{:.4}", p.refill_rate_per_second)),
            Cell::new(format_window(p.refill_interval_ms)),
            Cell::new(status),
        ]);
    }

    table.to_string()
}

/// Format policies as JSON
pub fn format_policies_json(policies: &[PolicyEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "policies": policies }))
}

/// Format a routing decision as a table
pub fn format_decision_table(decision: &RoutingDecision) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    let s = &decision.scores;
    let fallbacks = if decision.fallbacks.is_empty() {
        "-".dimmed().to_string()
    } else {
        decision.fallbacks.join(" → ")
    };
    table.add_row(vec![
        Cell::new("Model"),
        Cell::new(decision.selected_model.as_str().bold().to_string()),
    ]);
    table.add_row(vec![Cell::new("Provider"), Cell::new(&decision.provider)]);
    table.add_row(vec![Cell::new("Tier"), Cell::new(decision.tier)]);
    table.add_row(vec![
        Cell::new("Scores"),
        Cell::new(format!(
            "final {:.3}  quality {:.3}  cost {:.3}  availability {:.3}",
            s.final_score, s.quality, s.cost, s.availability
        )),
    ]);
    table.add_row(vec![Cell::new("Fallbacks"), Cell::new(fallbacks)]);
    table.add_row(vec![
        Cell::new("Est. tokens"),
        Cell::new(decision.estimated_tokens),
    ]);
    table.add_row(vec![Cell::new("Reasoning"), Cell::new(&decision.reasoning)]);

    table.to_string()
}

/// Format a routing decision as JSON
pub fn format_decision_json(decision: &RoutingDecision) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(decision)
}
