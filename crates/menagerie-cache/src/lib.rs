//! In-process caching for the Menagerie registry.
//!
//! [`TtlCache`] is the bounded, time-expiring read-through cache;
//! [`CacheCoordinator`] owns one cache per namespace and decides, per
//! mutation, what to invalidate. No coherence across processes: each
//! instance caches independently, and staleness after a lost invalidation
//! is bounded by the TTL.

mod cache;
mod coordinator;

pub use cache::TtlCache;
pub use coordinator::{CacheAction, CacheCoordinator, Mutation, plan};

use std::time::Duration;

/// Entries expire this long after being written, independent of size
/// pressure or how often they are read.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Maximum entries per namespace before least-recently-used eviction.
pub const DEFAULT_CAPACITY: usize = 10_000;
