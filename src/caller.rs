//! Caller identifiers shared by admission and routing

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest caller id accepted from request handlers.
pub const MAX_CALLER_ID_LEN: usize = 128;

/// Rejected caller id. Surfaced to clients as a 400, never as a 429.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCallerId {
    #[error("caller id is empty")]
    Empty,

    #[error("caller id exceeds {max} characters")]
    TooLong { max: usize },

    #[error("caller id contains whitespace or control characters")]
    IllegalCharacter,
}

/// A validated, non-empty caller id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallerId(String);

impl CallerId {
    /// Validate an untrusted caller id.
    pub fn parse(value: &str) -> Result<Self, InvalidCallerId> {
        if value.is_empty() {
            return Err(InvalidCallerId::Empty);
        }
        if value.chars().count() > MAX_CALLER_ID_LEN {
            return Err(InvalidCallerId::TooLong {
                max: MAX_CALLER_ID_LEN,
            });
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidCallerId::IllegalCharacter);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CallerId {
    type Error = InvalidCallerId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CallerId::parse(&value)
    }
}

impl From<CallerId> for String {
    fn from(id: CallerId) -> Self {
        id.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
