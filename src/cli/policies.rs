//! Policies command handler

use super::output::{format_policies_json, format_policies_table};
use super::PoliciesArgs;
use crate::api::PolicyEntry;
use crate::admission::PolicyTable;
use crate::tier::Tier;

/// Render the policy table for `switchyard policies`.
pub fn handle_policies(
    args: &PoliciesArgs,
    table: &PolicyTable,
) -> Result<String, Box<dyn std::error::Error>> {
    let tier = match &args.tier {
        Some(t) => Some(t.parse::<Tier>()?),
        None => None,
    };

    let entries: Vec<PolicyEntry> = table
        .entries()
        .into_iter()
        .filter(|(_, t, _)| tier.map_or(true, |wanted| *t == wanted))
        .map(|(endpoint, tier, policy)| PolicyEntry::new(endpoint, tier, policy))
        .collect();

    if args.json {
        Ok(format_policies_json(&entries)?)
    } else {
        Ok(format_policies_table(&entries))
    }
}
