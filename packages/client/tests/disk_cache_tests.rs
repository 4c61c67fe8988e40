use std::fs;
use std::io::BufWriter;

use bytes::Bytes;
use quarry_client::cache::disk_cache::{CACHE_MAGIC, CacheHeader};
use quarry_client::prelude::*;
use tempfile::TempDir;

fn entry(data: &'static [u8]) -> CacheEntry {
    let mut entry = CacheEntry {
        data: Bytes::from_static(data),
        etag: Some("\"v1\"".to_string()),
        server_date: 784_111_777_000,
        last_modified: 784_000_000_000,
        ttl: i64::MAX,
        soft_ttl: i64::MAX - 1,
        ..CacheEntry::default()
    };
    entry
        .response_headers
        .insert("Content-Type".into(), "text/plain".into());
    entry
}

/// Record of exactly 308 bytes: 58 header bytes for a two-char key with no
/// etag and no headers, plus 250 body bytes.
fn sized_entry() -> CacheEntry {
    CacheEntry {
        data: Bytes::from(vec![7u8; 250]),
        ttl: i64::MAX,
        soft_ttl: i64::MAX,
        ..CacheEntry::default()
    }
}

fn cache_in(dir: &TempDir, max_bytes: u64) -> DiskCache {
    let cache = DiskCache::new(dir.path(), DiskCacheConfig::with_max_bytes(max_bytes));
    cache.initialize();
    cache
}

#[test]
fn test_put_then_get_returns_identical_entry() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    let original = entry(b"hello world");

    cache.put("http://example.com/a", &original);
    let loaded = cache.get("http://example.com/a").unwrap();

    assert_eq!(loaded, original);
    assert_eq!(cache.stats().snapshot().hits, 1);
}

#[test]
fn test_record_file_starts_with_magic() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    cache.put("key", &entry(b"body"));

    let raw = fs::read(cache.file_for_key("key")).unwrap();
    assert_eq!(raw[..4], CACHE_MAGIC.to_le_bytes());
    assert!(raw.ends_with(b"body"));
    assert_eq!(raw.len() as u64, cache.total_size());
}

#[test]
fn test_missing_key_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024);
    assert!(cache.get("nothing").is_none());
    assert_eq!(cache.stats().snapshot().misses, 1);
}

#[test]
fn test_initialize_rebuilds_index_from_disk() {
    let dir = TempDir::new().unwrap();
    {
        let cache = cache_in(&dir, 1024 * 1024);
        cache.put("one", &entry(b"1"));
        cache.put("two", &entry(b"22"));
    }

    let reopened = cache_in(&dir, 1024 * 1024);
    assert_eq!(reopened.len(), 2);

    let on_disk: u64 = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().metadata().unwrap().len())
        .sum();
    assert_eq!(reopened.total_size(), on_disk);
    assert_eq!(reopened.get("two").unwrap().data, Bytes::from_static(b"22"));
}

#[test]
fn test_initialize_deletes_unreadable_files() {
    let dir = TempDir::new().unwrap();
    let junk = dir.path().join("junk");
    fs::write(&junk, b"definitely not a cache record").unwrap();

    let cache = cache_in(&dir, 1024);
    assert!(cache.is_empty());
    assert!(!junk.exists());
}

#[test]
fn test_initialize_creates_missing_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("cache");
    let cache = DiskCache::with_root(&root);
    cache.initialize();
    assert!(root.is_dir());
    assert!(cache.is_empty());
}

#[test]
fn test_corrupt_record_is_a_miss_and_removed() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    cache.put("key", &entry(b"body"));

    let path = cache.file_for_key("key");
    fs::write(&path, [0xde, 0xad, 0xbe, 0xef, 0, 0]).unwrap();

    assert!(cache.get("key").is_none());
    assert!(!cache.contains_key("key"));
    assert!(!path.exists());
    assert_eq!(cache.total_size(), 0);
}

#[test]
fn test_key_mismatch_drops_index_entry_only() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    cache.put("mine", &entry(b"body"));

    // Simulate another key colliding on the same file name.
    let path = cache.file_for_key("mine");
    let header = CacheHeader::from_entry("theirs", &entry(b"body"));
    let mut out = BufWriter::new(fs::File::create(&path).unwrap());
    header.write_to(&mut out).unwrap();
    std::io::Write::write_all(&mut out, b"body").unwrap();
    drop(out);

    assert!(cache.get("mine").is_none());
    assert!(!cache.contains_key("mine"));
    assert!(path.exists());
}

#[test]
fn test_eviction_keeps_total_under_limit_in_lru_order() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1000);

    cache.put("k0", &sized_entry());
    cache.put("k1", &sized_entry());
    cache.put("k2", &sized_entry());
    assert_eq!(cache.total_size(), 924);

    // Touch k0 so it becomes the most recently used.
    assert!(cache.get("k0").is_some());

    // 924 + 308 crosses the limit; pruning stops once 308 more fit under 900.
    cache.put("k3", &sized_entry());

    assert_eq!(cache.keys(), vec!["k0".to_string(), "k3".to_string()]);
    assert_eq!(cache.total_size(), 616);
    assert!(!cache.file_for_key("k1").exists());
    assert!(!cache.file_for_key("k2").exists());
    assert_eq!(cache.stats().snapshot().evictions, 2);
}

#[test]
fn test_oversized_entry_is_not_stored() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 100);

    cache.put("big", &sized_entry());
    assert!(cache.get("big").is_none());
    assert!(!cache.file_for_key("big").exists());
    assert_eq!(cache.total_size(), 0);
}

#[test]
fn test_replacing_entry_adjusts_total_size() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);

    cache.put("k", &entry(b"short"));
    let first = cache.total_size();
    cache.put("k", &entry(b"a good deal longer"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.total_size(), first + 13);
}

#[test]
fn test_invalidate_soft_and_full() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);

    cache.put("soft", &entry(b"x"));
    cache.invalidate("soft", false);
    let soft = cache.get("soft").unwrap();
    assert_eq!(soft.soft_ttl, 0);
    assert_eq!(soft.ttl, i64::MAX);
    assert!(soft.refresh_needed());
    assert!(!soft.is_expired());

    cache.put("full", &entry(b"x"));
    cache.invalidate("full", true);
    let full = cache.get("full").unwrap();
    assert_eq!(full.soft_ttl, 0);
    assert_eq!(full.ttl, 0);
    assert!(full.is_expired());

    // Unknown keys are ignored.
    cache.invalidate("absent", true);
    assert!(cache.get("absent").is_none());
}

#[test]
fn test_remove_deletes_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    cache.put("gone", &entry(b"x"));
    let path = cache.file_for_key("gone");

    cache.remove("gone");
    assert!(!path.exists());
    assert!(cache.get("gone").is_none());
    assert_eq!(cache.total_size(), 0);
}

#[test]
fn test_clear_empties_directory_and_index() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1024 * 1024);
    cache.put("a", &entry(b"1"));
    cache.put("b", &entry(b"2"));

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.total_size(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
