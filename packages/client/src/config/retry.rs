//! Retry Configuration Module
//!
//! Serializable settings for [`DefaultRetryPolicy`]; every request gets a fresh
//! policy built from them.

use serde::{Deserialize, Serialize};

use crate::retry::{DEFAULT_BACKOFF_MULT, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS, DefaultRetryPolicy};

/// Runtime retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Timeout of the first attempt in milliseconds
    pub initial_timeout_ms: u64,
    pub max_retries: u32,
    /// Fraction of the current timeout added after each retry
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_multiplier: DEFAULT_BACKOFF_MULT,
        }
    }
}

impl RetryConfig {
    /// Create aggressive retry configuration for critical requests
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            initial_timeout_ms: 1000,
            max_retries: 3,
            backoff_multiplier: 1.0,
        }
    }

    /// Create conservative retry configuration
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            initial_timeout_ms: 10_000,
            max_retries: 1,
            backoff_multiplier: 0.5,
        }
    }

    /// Validate retry configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the initial timeout is zero or the multiplier is
    /// negative or not finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_timeout_ms == 0 {
            return Err("initial_timeout_ms must be greater than 0".to_string());
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 0.0 {
            return Err("backoff_multiplier must be a non-negative number".to_string());
        }

        Ok(())
    }

    /// A fresh policy for one request
    pub fn policy(&self) -> DefaultRetryPolicy {
        DefaultRetryPolicy::new(
            self.initial_timeout_ms,
            self.max_retries,
            self.backoff_multiplier,
        )
    }
}
