//! Services cache and order log for the unlock relay.
//!
//! A small JSON blob: the most recent provider service list with a TTL,
//! plus an append-only log of submitted orders. Kept in memory and,
//! optionally, written through to a file.

mod error;
mod store;
mod types;

pub use error::OrderStoreError;
pub use store::OrderStore;
pub use types::{CacheState, DeviceKind, OrderRecord};
