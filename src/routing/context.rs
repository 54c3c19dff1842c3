//! Per-request routing input

use super::error::RoutingError;
use crate::caller::CallerId;
use crate::tier::Tier;

/// Estimate the token count of a prompt from its word count.
///
/// Roughly 4 tokens per 3 English words, rounded up. Monotonic in the
/// number of words, and an empty prompt costs nothing.
pub fn estimate_tokens(prompt: &str) -> u32 {
    let words = prompt.split_whitespace().count() as u64;
    let tokens = (words * 4).div_ceil(3);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

/// Everything the router needs to know about one request.
///
/// Built once per request and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    caller_id: CallerId,
    tier: Tier,
    prompt: String,
    request_id: String,
    estimated_tokens: u32,
}

impl RoutingContext {
    /// Build a context for a known tier, estimating tokens from the prompt.
    pub fn new(caller_id: &str, tier: Tier, prompt: impl Into<String>) -> Result<Self, RoutingError> {
        let caller_id = CallerId::parse(caller_id)?;
        let prompt = prompt.into();
        let estimated_tokens = estimate_tokens(&prompt);
        Ok(Self {
            caller_id,
            tier,
            prompt,
            request_id: crate::logging::generate_request_id(),
            estimated_tokens,
        })
    }

    /// Build a context from request strings. Unrecognized tiers route as Free.
    pub fn from_untrusted(
        caller_id: &str,
        tier: &str,
        prompt: impl Into<String>,
    ) -> Result<Self, RoutingError> {
        Self::new(caller_id, Tier::from_untrusted(tier), prompt)
    }

    /// Keep a caller-supplied request id. Empty ids are ignored.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        if !request_id.trim().is_empty() {
            self.request_id = request_id;
        }
        self
    }

    /// Override the word-count estimate with an exact token count.
    pub fn with_token_estimate(mut self, tokens: u32) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    pub fn caller_id(&self) -> &CallerId {
        &self.caller_id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn estimated_tokens(&self) -> u32 {
        self.estimated_tokens
    }
}
