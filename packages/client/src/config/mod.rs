//! Configuration for the queue, the network layer, retries and the disk cache
//!
//! Every struct has a `Default` matching the documented defaults, derives
//! serde with `#[serde(default)]` so partial documents deserialize, and where
//! values can be out of range offers `validate()`.

pub mod network;
pub mod queue;
pub mod retry;

// Re-export all configuration types for easy access
pub use crate::cache::DiskCacheConfig;
pub use network::NetworkConfig;
pub use queue::{DEFAULT_NETWORK_THREAD_POOL_SIZE, QueueConfig};
pub use retry::RetryConfig;
