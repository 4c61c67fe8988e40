//! Disk cache configuration and preset policies

use serde::{Deserialize, Serialize};

/// Default cache size budget: 5 MiB
pub const DEFAULT_DISK_USAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Eviction stops once usage drops below this fraction of the budget.
pub const HYSTERESIS_FACTOR: f32 = 0.9;

/// Disk cache limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCacheConfig {
    /// Maximum bytes the cache directory may hold
    pub max_bytes: u64,
    /// Fraction of `max_bytes` eviction prunes down to
    pub hysteresis_factor: f32,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_DISK_USAGE_BYTES,
            hysteresis_factor: HYSTERESIS_FACTOR,
        }
    }
}

impl DiskCacheConfig {
    /// Configuration with a custom budget and the default hysteresis
    #[must_use]
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    /// 1 MiB budget for constrained devices
    #[must_use]
    pub fn small() -> Self {
        Self::with_max_bytes(1024 * 1024)
    }

    /// 50 MiB budget
    #[must_use]
    pub fn large() -> Self {
        Self::with_max_bytes(50 * 1024 * 1024)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_bytes == 0 {
            return Err("max_bytes must be greater than 0".to_string());
        }
        if !(self.hysteresis_factor > 0.0 && self.hysteresis_factor <= 1.0) {
            return Err("hysteresis_factor must be in (0.0, 1.0]".to_string());
        }
        Ok(())
    }

    /// Usage target eviction prunes down to
    pub(crate) fn prune_target(&self) -> u64 {
        (self.max_bytes as f64 * f64::from(self.hysteresis_factor)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiskCacheConfig::default();
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
        assert_eq!(DiskCacheConfig::with_max_bytes(1000).prune_target(), 900);
    }

    #[test]
    fn test_validation() {
        assert!(DiskCacheConfig::with_max_bytes(0).validate().is_err());
        let config = DiskCacheConfig {
            hysteresis_factor: 1.5,
            ..DiskCacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: DiskCacheConfig = serde_json::from_str(r#"{"max_bytes": 2048}"#).unwrap();
        assert_eq!(config.max_bytes, 2048);
        assert_eq!(config.hysteresis_factor, HYSTERESIS_FACTOR);
    }
}
