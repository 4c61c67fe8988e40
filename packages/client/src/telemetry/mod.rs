//! Queue statistics and per-request event markers

pub mod markers;
pub mod queue_stats;

// Re-export key types for convenience
pub use markers::{Marker, MarkerLog};
pub use queue_stats::{QueueStats, QueueStatsSnapshot};
