//! Network Configuration Module

use serde::{Deserialize, Serialize};

/// Settings for [`BasicNetwork`](crate::network::BasicNetwork)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Requests slower than this are logged at debug level
    pub slow_request_threshold_ms: u64,
    /// Let the retry policy see 5xx answers instead of failing at once
    pub retry_server_errors: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            slow_request_threshold_ms: 3000,
            retry_server_errors: false,
        }
    }
}

impl NetworkConfig {
    /// Retry 5xx responses like timeouts
    #[must_use]
    pub fn retrying_server_errors() -> Self {
        Self {
            retry_server_errors: true,
            ..Self::default()
        }
    }
}
