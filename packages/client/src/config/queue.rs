use serde::{Deserialize, Serialize};

/// Default number of network dispatcher threads
pub const DEFAULT_NETWORK_THREAD_POOL_SIZE: usize = 4;

/// Request queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of network dispatcher threads
    pub network_threads: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            network_threads: DEFAULT_NETWORK_THREAD_POOL_SIZE,
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn with_network_threads(network_threads: usize) -> Self {
        Self { network_threads }
    }

    /// # Errors
    ///
    /// Returns an error if no network thread is configured.
    pub fn validate(&self) -> Result<(), String> {
        if self.network_threads == 0 {
            return Err("network_threads must be at least 1".to_string());
        }
        Ok(())
    }
}
