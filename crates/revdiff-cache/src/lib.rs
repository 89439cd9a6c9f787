//! # revdiff-cache
//!
//! Best-effort byte cache for one account and one change. Entries are
//! addressed by [`CacheKey`]s whose layout keeps distinct revision pairings
//! apart, so nothing here ever expires entries on its own; callers remove
//! keys explicitly when a write makes them stale.

pub mod disk;
pub mod gateway;
pub mod keys;

mod error;

pub use disk::DiskCache;
pub use error::{CacheError, Result};
pub use gateway::CacheGateway;
pub use keys::CacheKey;
