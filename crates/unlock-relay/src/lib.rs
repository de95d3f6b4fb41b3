//! Unlock relay - HTTP front for a DHRU-style unlock reseller API.
//!
//! The relay sits between storefront code and a reseller provider whose
//! HTTP contract varies per deployment. It:
//! - probes for a working endpoint, credential placement, and field names
//!   (and caches what it discovers),
//! - normalizes the provider's inconsistent response shapes,
//! - validates IMEIs/serial numbers before money is spent,
//! - caches the service catalog and keeps a local order log.

pub mod api;
pub mod config;
pub mod error;
pub mod validation;

pub use config::Config;
pub use error::RelayError;
