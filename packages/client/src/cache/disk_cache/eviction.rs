//! LRU pruning with hysteresis

use std::time::Instant;

use super::core::{DiskCache, Index};
use super::operations::delete_file;

impl DiskCache {
    /// Make room for `needed` bytes.
    ///
    /// Does nothing while `total + needed` stays under the budget. Otherwise
    /// evicts least recently used records until `total + needed` drops below
    /// `max_bytes * hysteresis_factor`, so a full cache is not pruned again on
    /// the very next write.
    pub(super) fn prune_if_needed(&self, index: &mut Index, needed: u64) {
        if index.total_size + needed < self.config.max_bytes {
            return;
        }

        tracing::debug!(target: "quarry::cache", "Pruning old cache entries");

        let before = index.total_size;
        let target = self.config.prune_target();
        let started = Instant::now();
        let mut pruned = 0usize;

        while let Some((key, header)) = index.entries.shift_remove_index(0) {
            let path = self.file_for_key(&key);
            if path.exists() {
                delete_file(&path);
            }
            index.total_size = index.total_size.saturating_sub(header.size);
            self.stats.record_eviction();
            pruned += 1;

            if index.total_size + needed < target {
                break;
            }
        }

        tracing::debug!(
            target: "quarry::cache",
            pruned,
            freed = before - index.total_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pruned cache entries"
        );
    }
}
