//! Response caching
//!
//! - `Cache`: the storage interface the dispatchers resolve requests against
//! - `DiskCache`: one file per key under a root directory, LRU eviction
//! - `NoCache`: stores nothing, for queues that always go to the network
//! - `header_parser`: HTTP cache headers to `CacheEntry` freshness

pub mod cache_config;
pub mod cache_entry;
pub mod cache_stats;
pub mod disk_cache;
pub mod header_parser;
pub mod http_date;

// Re-export all public types and functions
pub use cache_config::DiskCacheConfig;
pub use cache_entry::CacheEntry;
pub use cache_stats::{CacheStats, CacheStatsSnapshot};
pub use disk_cache::{CacheFormatError, DiskCache};
pub use http_date::HttpDateParseError;

/// Byte-addressable response store keyed by request cache key.
///
/// Implementations are shared between the cache worker, every network
/// worker and callers, and must serialize their own access.
pub trait Cache: Send + Sync {
    /// Look up an entry. Unreadable entries are reported as misses.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Store or replace an entry.
    fn put(&self, key: &str, entry: &CacheEntry);

    /// Prepare for use. Called once from the cache worker before it serves.
    fn initialize(&self);

    /// Force a refresh: zero the soft TTL, and the hard TTL as well when
    /// `full_expire` is set.
    fn invalidate(&self, key: &str, full_expire: bool);

    fn remove(&self, key: &str);

    fn clear(&self);
}

/// A cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    fn put(&self, _key: &str, _entry: &CacheEntry) {}

    fn initialize(&self) {}

    fn invalidate(&self, _key: &str, _full_expire: bool) {}

    fn remove(&self, _key: &str) {}

    fn clear(&self) {}
}
