//! Compatibility client for DHRU-style device unlock reseller APIs.
//!
//! Provider deployments share a loose convention but disagree on endpoint
//! paths, credential placement, credential field names, and response field
//! names. This crate probes candidate combinations until one works, caches
//! the discovery process-wide, and normalizes the inconsistent payloads.

mod client;
mod error;
pub mod normalize;
pub mod redact;
mod types;

pub use client::{DhruClient, DEFAULT_TIMEOUT};
pub use error::DhruError;
pub use types::*;
