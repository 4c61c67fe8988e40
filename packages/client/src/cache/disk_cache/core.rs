//! Core DiskCache structure, in-memory index and file naming

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use super::format::CacheHeader;
use crate::cache::{cache_config::DiskCacheConfig, cache_stats::CacheStats};

/// Cache that stores one file per key under a root directory.
///
/// A single mutex guards both the index and every file operation, so the
/// index always describes what is on disk.
pub struct DiskCache {
    pub(super) root: PathBuf,
    pub(super) config: DiskCacheConfig,
    pub(super) index: Mutex<Index>,
    pub(super) stats: CacheStats,
}

/// Access-ordered headers, oldest first, with the summed record size.
#[derive(Debug, Default)]
pub(super) struct Index {
    pub(super) entries: IndexMap<String, CacheHeader>,
    pub(super) total_size: u64,
}

impl Index {
    /// Insert or replace, moving the key to the most-recent end.
    pub(super) fn insert(&mut self, key: String, header: CacheHeader) {
        self.total_size += header.size;
        if let Some(old) = self.entries.shift_remove(&key) {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        self.entries.insert(key, header);
    }

    pub(super) fn remove(&mut self, key: &str) -> Option<CacheHeader> {
        let removed = self.entries.shift_remove(key)?;
        self.total_size = self.total_size.saturating_sub(removed.size);
        Some(removed)
    }

    /// Mark a key as most recently used.
    pub(super) fn touch(&mut self, key: &str) {
        if let Some(index) = self.entries.get_index_of(key) {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
        }
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>, config: DiskCacheConfig) -> Self {
        Self {
            root: root.into(),
            config,
            index: Mutex::new(Index::default()),
            stats: CacheStats::default(),
        }
    }

    /// Cache with the default 5 MiB budget
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DiskCacheConfig::default())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DiskCacheConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Bytes currently accounted to stored records
    pub fn total_size(&self) -> u64 {
        self.lock_index().total_size
    }

    pub fn len(&self) -> usize {
        self.lock_index().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock_index().entries.contains_key(key)
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Vec<String> {
        self.lock_index().entries.keys().cloned().collect()
    }

    /// Path of the record file for `key`
    pub fn file_for_key(&self, key: &str) -> PathBuf {
        self.root.join(filename_for_key(key))
    }

    pub(super) fn lock_index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deterministic file name for a key.
///
/// Hashes each UTF-16 half of the key with the 32-bit `h = 31 * h + c`
/// string hash and concatenates both values in decimal, so caches written by
/// other clients using the same scheme stay readable.
pub fn filename_for_key(key: &str) -> String {
    let units: Vec<u16> = key.encode_utf16().collect();
    let mid = units.len() / 2;
    format!("{}{}", string_hash(&units[..mid]), string_hash(&units[mid..]))
}

fn string_hash(units: &[u16]) -> i32 {
    units
        .iter()
        .fold(0i32, |h, &c| h.wrapping_mul(31).wrapping_add(i32::from(c)))
}
