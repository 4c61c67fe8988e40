//! Request queue statistics with cache-padded atomic counters
//!
//! Every dispatcher thread bumps these counters, so each one sits on its own
//! cache line.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Counters for one [`RequestQueue`](crate::queue::RequestQueue)
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Requests accepted by `add`
    pub added: CachePadded<AtomicU64>,
    /// Requests parked behind an identical in-flight request
    pub staged: CachePadded<AtomicU64>,
    /// Requests that reached `finish`
    pub finished: CachePadded<AtomicU64>,
    /// Requests dropped by a dispatcher because they were canceled or intercepted
    pub discarded: CachePadded<AtomicU64>,
    /// Fresh cache hits
    pub cache_hits: CachePadded<AtomicU64>,
    /// Hits served while a refresh was started
    pub soft_hits: CachePadded<AtomicU64>,
    /// Hits too stale to serve
    pub expired_hits: CachePadded<AtomicU64>,
    pub cache_misses: CachePadded<AtomicU64>,
    /// Calls into the network layer
    pub network_requests: CachePadded<AtomicU64>,
    /// 304 answers that needed no second delivery
    pub not_modified: CachePadded<AtomicU64>,
    /// Successful responses handed to delivery
    pub deliveries: CachePadded<AtomicU64>,
    /// Errors handed to delivery
    pub errors: CachePadded<AtomicU64>,
    /// Panics caught in a dispatcher
    pub panics: CachePadded<AtomicU64>,
}

/// Immutable snapshot of queue statistics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub added: u64,
    pub staged: u64,
    pub finished: u64,
    pub discarded: u64,
    pub cache_hits: u64,
    pub soft_hits: u64,
    pub expired_hits: u64,
    pub cache_misses: u64,
    pub network_requests: u64,
    pub not_modified: u64,
    pub deliveries: u64,
    pub errors: u64,
    pub panics: u64,
}

impl QueueStats {
    #[inline]
    pub(crate) fn incr(counter: &CachePadded<AtomicU64>) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter with relaxed ordering.
    #[inline]
    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            added: self.added.load(Ordering::Relaxed),
            staged: self.staged.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            soft_hits: self.soft_hits.load(Ordering::Relaxed),
            expired_hits: self.expired_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_requests: self.network_requests.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

impl QueueStatsSnapshot {
    /// Share of cache lookups served from the cache, fresh or soft
    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.cache_hits + self.soft_hits;
        let total = served + self.expired_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = served as f64 / total as f64;
            rate
        }
    }
}
