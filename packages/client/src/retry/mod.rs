//! Retry policies consulted by the network layer between attempts

pub mod policy;

// Re-export main types for convenient access
pub use policy::{
    DEFAULT_BACKOFF_MULT, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS, DefaultRetryPolicy, RetryPolicy,
};
