//! Subscription tiers and rate-limited endpoints
//!
//! Both are closed enums internally. Untrusted strings coming from request
//! handlers are parsed with [`Tier::from_untrusted`] and
//! [`Endpoint::from_untrusted`], which never fail: unknown values resolve to
//! the most restrictive variant. Configuration files use the strict
//! [`FromStr`] impls so typos are caught at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller subscription level. Ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Business,
    Enterprise,
}

impl Tier {
    /// All tiers, least privileged first.
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Pro, Tier::Business, Tier::Enterprise];

    /// Parse a tier from request input. Unknown values become [`Tier::Free`].
    pub fn from_untrusted(value: &str) -> Self {
        match value.parse() {
            Ok(tier) => tier,
            Err(_) => {
                tracing::debug!(tier = %value, "Unrecognized tier, treating as free");
                Tier::Free
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Business => "business",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "business" => Ok(Tier::Business),
            "enterprise" => Ok(Tier::Enterprise),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate-limited platform endpoint.
///
/// `Other` stands in for any identifier the platform sends that is not in
/// this list; it always maps to the most restrictive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Endpoint {
    #[serde(rename = "chat:send")]
    ChatSend,
    #[serde(rename = "documents:upload")]
    DocumentUpload,
    #[serde(rename = "documents:analyze")]
    DocumentAnalyze,
    #[serde(rename = "images:generate")]
    ImageGenerate,
    #[serde(rename = "tasks:create")]
    TaskCreate,
    #[serde(rename = "support:message")]
    SupportMessage,
    #[serde(rename = "other")]
    Other,
}

impl Endpoint {
    /// Every known endpoint, `Other` last.
    pub const ALL: [Endpoint; 7] = [
        Endpoint::ChatSend,
        Endpoint::DocumentUpload,
        Endpoint::DocumentAnalyze,
        Endpoint::ImageGenerate,
        Endpoint::TaskCreate,
        Endpoint::SupportMessage,
        Endpoint::Other,
    ];

    /// Parse an endpoint id from request input. Unknown ids become `Other`.
    pub fn from_untrusted(value: &str) -> Self {
        match value.parse() {
            Ok(endpoint) => endpoint,
            Err(_) => {
                tracing::debug!(endpoint = %value, "Unrecognized endpoint, applying default policy");
                Endpoint::Other
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::ChatSend => "chat:send",
            Endpoint::DocumentUpload => "documents:upload",
            Endpoint::DocumentAnalyze => "documents:analyze",
            Endpoint::ImageGenerate => "images:generate",
            Endpoint::TaskCreate => "tasks:create",
            Endpoint::SupportMessage => "support:message",
            Endpoint::Other => "other",
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| format!("Unknown endpoint: {}", s))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
