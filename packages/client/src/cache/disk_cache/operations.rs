//! Cache trait implementation for DiskCache
//!
//! Public operations take the index lock once and delegate to the `_locked`
//! helpers, which assume the caller already holds it.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use bytes::Bytes;
use tempfile::NamedTempFile;

use super::core::{DiskCache, Index};
use super::format::{CacheFormatError, CacheHeader, CountingReader};
use crate::cache::{Cache, CacheEntry};

impl Cache for DiskCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut index = self.lock_index();
        self.get_locked(&mut index, key)
    }

    fn put(&self, key: &str, entry: &CacheEntry) {
        let mut index = self.lock_index();
        self.put_locked(&mut index, key, entry);
    }

    fn initialize(&self) {
        let mut index = self.lock_index();

        if !self.root.exists() {
            if let Err(e) = fs::create_dir_all(&self.root) {
                tracing::error!(
                    target: "quarry::cache",
                    root = %self.root.display(),
                    error = %e,
                    "Unable to create cache dir"
                );
            }
            return;
        }

        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!(
                    target: "quarry::cache",
                    root = %self.root.display(),
                    error = %e,
                    "Unable to list cache dir"
                );
                return;
            }
        };

        let mut loaded = 0usize;
        for path in dir.filter_map(|entry| entry.ok().map(|e| e.path())) {
            if !path.is_file() {
                continue;
            }
            match read_header(&path) {
                Ok(mut header) => {
                    header.size = fs::metadata(&path).map(|m| m.len()).unwrap_or(header.size);
                    index.insert(header.key.clone(), header);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::debug!(
                        target: "quarry::cache",
                        path = %path.display(),
                        error = %e,
                        "Deleting unreadable cache file"
                    );
                    self.stats.record_error();
                    delete_file(&path);
                }
            }
        }

        tracing::debug!(
            target: "quarry::cache",
            entries = loaded,
            total_size = index.total_size,
            "Cache initialized"
        );
    }

    fn invalidate(&self, key: &str, full_expire: bool) {
        let mut index = self.lock_index();
        if let Some(mut entry) = self.get_locked(&mut index, key) {
            entry.soft_ttl = 0;
            if full_expire {
                entry.ttl = 0;
            }
            self.put_locked(&mut index, key, &entry);
        }
    }

    fn remove(&self, key: &str) {
        let mut index = self.lock_index();
        self.remove_locked(&mut index, key);
    }

    fn clear(&self) {
        let mut index = self.lock_index();
        if let Ok(dir) = fs::read_dir(&self.root) {
            for path in dir.filter_map(|entry| entry.ok().map(|e| e.path())) {
                if path.is_file() {
                    delete_file(&path);
                }
            }
        }
        index.clear();
        tracing::debug!(target: "quarry::cache", "Cache cleared");
    }
}

impl DiskCache {
    fn get_locked(&self, index: &mut Index, key: &str) -> Option<CacheEntry> {
        if !index.entries.contains_key(key) {
            self.stats.record_miss();
            return None;
        }

        let path = self.file_for_key(key);
        match read_record(&path) {
            Ok((header, data)) if header.key == key => {
                index.touch(key);
                self.stats.record_hit();
                Some(header.into_entry(data))
            }
            Ok((header, _)) => {
                // Another key hashed to the same file name and overwrote it.
                tracing::debug!(
                    target: "quarry::cache",
                    path = %path.display(),
                    requested = key,
                    found = %header.key,
                    "Key mismatch in cache file"
                );
                index.remove(key);
                self.stats.record_miss();
                None
            }
            Err(e) => {
                tracing::debug!(
                    target: "quarry::cache",
                    path = %path.display(),
                    error = %e,
                    "Unreadable cache file"
                );
                self.stats.record_error();
                self.stats.record_miss();
                self.remove_locked(index, key);
                None
            }
        }
    }

    fn put_locked(&self, index: &mut Index, key: &str, entry: &CacheEntry) {
        if !self.root.exists()
            && let Err(e) = fs::create_dir_all(&self.root)
        {
            tracing::error!(
                target: "quarry::cache",
                root = %self.root.display(),
                error = %e,
                "Unable to create cache dir"
            );
            return;
        }

        let header = CacheHeader::from_entry(key, entry);
        if header.size > self.config.max_bytes {
            tracing::debug!(
                target: "quarry::cache",
                key,
                size = header.size,
                max_bytes = self.config.max_bytes,
                "Entry larger than the cache, not storing"
            );
            return;
        }

        self.prune_if_needed(index, header.size);

        let path = self.file_for_key(key);
        match write_record(&self.root, &path, &header, &entry.data) {
            Ok(()) => {
                index.insert(key.to_string(), header);
                self.stats.record_write();
            }
            Err(e) => {
                tracing::warn!(
                    target: "quarry::cache",
                    path = %path.display(),
                    error = %e,
                    "Failed to write cache record"
                );
                self.stats.record_error();
                if path.exists() {
                    delete_file(&path);
                }
                index.remove(key);
            }
        }
    }

    pub(super) fn remove_locked(&self, index: &mut Index, key: &str) {
        let path = self.file_for_key(key);
        if path.exists() {
            delete_file(&path);
        }
        index.remove(key);
    }
}

fn read_header(path: &Path) -> Result<CacheHeader, CacheFormatError> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = CountingReader::new(BufReader::new(file), len);
    CacheHeader::read_from(&mut reader)
}

fn read_record(path: &Path) -> Result<(CacheHeader, Bytes), CacheFormatError> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = CountingReader::new(BufReader::new(file), len);
    let header = CacheHeader::read_from(&mut reader)?;
    let data = reader.read_remaining()?;
    Ok((header, data))
}

/// Write through a temp file in the cache root and rename into place, so a
/// crash never leaves a half-written record under the final name.
fn write_record(root: &Path, path: &Path, header: &CacheHeader, data: &[u8]) -> io::Result<()> {
    let tmp = NamedTempFile::new_in(root)?;
    let mut writer = BufWriter::new(tmp);
    header.write_to(&mut writer)?;
    writer.write_all(data)?;
    let tmp = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub(super) fn delete_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                target: "quarry::cache",
                path = %path.display(),
                error = %e,
                "Could not delete cache file"
            );
            false
        }
    }
}
