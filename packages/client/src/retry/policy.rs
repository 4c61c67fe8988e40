//! Per-request retry policy
//!
//! A policy owns the per-attempt timeout and decides whether a failed attempt
//! may be repeated. Each retry grows the timeout by
//! `timeout * backoff_multiplier`, so a multiplier of 1.0 doubles it.

use std::time::Duration;

use crate::error::Error;

/// Default socket timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;

/// Default number of retries
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default backoff multiplier
pub const DEFAULT_BACKOFF_MULT: f32 = 1.0;

/// Retry decision hook attached to every request
pub trait RetryPolicy: Send {
    /// Timeout for the next attempt
    fn current_timeout(&self) -> Duration;

    /// Retries performed so far
    fn current_retry_count(&self) -> u32;

    /// Prepare for another attempt.
    ///
    /// Returns the error back when no attempts remain; the caller treats it
    /// as terminal.
    fn retry(&mut self, error: Error) -> Result<(), Error>;
}

/// Growing-timeout policy with a fixed retry budget
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultRetryPolicy {
    current_timeout_ms: u64,
    current_retry_count: u32,
    max_retries: u32,
    backoff_multiplier: f32,
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS, DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_MULT)
    }
}

impl DefaultRetryPolicy {
    pub fn new(initial_timeout_ms: u64, max_retries: u32, backoff_multiplier: f32) -> Self {
        Self {
            current_timeout_ms: initial_timeout_ms,
            current_retry_count: 0,
            max_retries,
            backoff_multiplier,
        }
    }

    pub fn backoff_multiplier(&self) -> f32 {
        self.backoff_multiplier
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn has_attempt_remaining(&self) -> bool {
        self.current_retry_count <= self.max_retries
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn current_timeout(&self) -> Duration {
        Duration::from_millis(self.current_timeout_ms)
    }

    fn current_retry_count(&self) -> u32 {
        self.current_retry_count
    }

    fn retry(&mut self, error: Error) -> Result<(), Error> {
        self.current_retry_count += 1;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let growth = (self.current_timeout_ms as f32 * self.backoff_multiplier) as u64;
        self.current_timeout_ms = self.current_timeout_ms.saturating_add(growth);

        if self.has_attempt_remaining() {
            Ok(())
        } else {
            Err(error)
        }
    }
}
