//! Error types for admission control

use super::store::StoreError;
use crate::caller::InvalidCallerId;
use thiserror::Error;

/// Errors from [`AdmissionController`](super::AdmissionController).
///
/// A denied request is not an error; it is an
/// [`AdmissionDecision`](super::AdmissionDecision) with `allowed == false`.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Caller id failed validation (surfaced as 400)
    #[error("invalid caller id: {0}")]
    InvalidCaller(#[from] InvalidCallerId),

    /// Compare-and-set kept losing races for one key
    #[error("bucket '{key}' is contended, gave up after {attempts} attempts")]
    Contention { key: String, attempts: u32 },

    /// Storage failed and no fallback absorbed it
    #[error(transparent)]
    Store(#[from] StoreError),
}
