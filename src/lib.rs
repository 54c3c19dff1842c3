//! Switchyard - traffic shaping in front of paid model calls
//!
//! Two decisions are made for every request: whether the caller may proceed
//! at all ([`admission`], per-endpoint token buckets keyed by caller and
//! tier), and which backend model should serve it ([`routing`], weighted
//! quality/cost/availability scoring with an ordered fallback chain).

pub mod admission;
pub mod api;
pub mod caller;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod routing;
pub mod tier;
