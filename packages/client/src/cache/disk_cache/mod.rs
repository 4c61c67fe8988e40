//! Persistent cache backed by one file per key
//!
//! The functionality is organized into logical modules:
//!
//! - `core`: DiskCache struct, the access-ordered index and file naming
//! - `format`: binary record encoding
//! - `operations`: the `Cache` implementation
//! - `eviction`: LRU pruning with hysteresis

pub mod core;
pub mod eviction;
pub mod format;
pub mod operations;

pub use self::core::{DiskCache, filename_for_key};
pub use format::{CACHE_MAGIC, CacheFormatError, CacheHeader};
