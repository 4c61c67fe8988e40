//! Cached response payload with freshness metadata
//!
//! Timestamps are epoch milliseconds. `soft_ttl` marks when the entry should be
//! revalidated in the background; `ttl` marks when it can no longer be served.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::cache::http_date::now_millis;

/// Cached response entry with metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    /// Response body as received from the network
    pub data: Bytes,
    /// ETag for conditional revalidation
    pub etag: Option<String>,
    /// `Date` reported by the server
    pub server_date: i64,
    /// `Last-Modified` reported by the server
    pub last_modified: i64,
    /// Hard expiry
    pub ttl: i64,
    /// Soft expiry
    pub soft_ttl: i64,
    /// Response headers, replayed on cache hits
    pub response_headers: BTreeMap<String, String>,
}

impl CacheEntry {
    /// True when the entry can no longer be served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.ttl
    }

    /// True when the entry can be served but should be refreshed.
    pub fn refresh_needed(&self) -> bool {
        self.refresh_needed_at(now_millis())
    }

    pub fn refresh_needed_at(&self, now_ms: i64) -> bool {
        now_ms > self.soft_ttl
    }

    /// Check if entry can be validated with a conditional request
    pub fn can_validate(&self) -> bool {
        self.etag.is_some() || self.last_modified > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: i64, soft_ttl: i64) -> CacheEntry {
        CacheEntry {
            ttl,
            soft_ttl,
            ..CacheEntry::default()
        }
    }

    #[test]
    fn test_freshness_boundaries_are_strict() {
        let e = entry(2_000, 1_000);

        assert!(!e.refresh_needed_at(1_000));
        assert!(e.refresh_needed_at(1_001));
        assert!(!e.is_expired_at(2_000));
        assert!(e.is_expired_at(2_001));
    }

    #[test]
    fn test_default_entry_is_expired() {
        let e = CacheEntry::default();
        assert!(e.is_expired());
        assert!(e.refresh_needed());
        assert!(!e.can_validate());
    }

    #[test]
    fn test_far_future_entry_is_fresh() {
        let e = entry(i64::MAX, i64::MAX);
        assert!(!e.is_expired());
        assert!(!e.refresh_needed());
    }
}
