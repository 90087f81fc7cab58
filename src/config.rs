//! Limiter configuration.
//!
//! A [`RateLimiterConfig`] is plain data: it can be built in code, or deserialized from any
//! serde format with the window expressed in milliseconds:
//!
//! ```rust
//! use paceline::{RateLimiterConfig, ReleaseMode};
//! use std::time::Duration;
//!
//! let cfg: RateLimiterConfig =
//!     serde_json::from_str(r#"{ "capacity": 5, "window_ms": 1000 }"#).unwrap();
//! assert_eq!(cfg.capacity, 5);
//! assert_eq!(cfg.window, Duration::from_secs(1));
//! assert_eq!(cfg.release, ReleaseMode::FromAcquisition);
//! assert!(cfg.validate().is_ok());
//! ```

use crate::error::{ConfigError, MAX_CAPACITY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When a granted permit goes back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMode {
    /// The permit returns `window` after it was granted, however long the holder takes.
    /// Bounds admissions over any window-length interval (throughput cap).
    #[default]
    FromAcquisition,
    /// The permit stays out until its holder releases it, then returns `window` later.
    /// Caps concurrent holders as well as throughput; a slow action slows admissions.
    AfterCompletion,
}

/// Capacity, window and release mode for a [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window.
    pub capacity: usize,
    /// Replenishment period.
    #[serde(rename = "window_ms", with = "duration_millis")]
    pub window: Duration,
    #[serde(default)]
    pub release: ReleaseMode,
}

impl RateLimiterConfig {
    /// Sliding-window config with the default release mode.
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self { capacity, window, release: ReleaseMode::default() }
    }

    /// Override the release mode.
    pub fn with_release(mut self, release: ReleaseMode) -> Self {
        self.release = release;
        self
    }

    /// Reject non-positive capacity or window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge { requested: self.capacity, max: MAX_CAPACITY });
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }
}

impl Default for RateLimiterConfig {
    /// Five admissions per second.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_per_second() {
        let cfg = RateLimiterConfig::default();
        assert_eq!(cfg.capacity, 5);
        assert_eq!(cfg.window, Duration::from_secs(1));
        assert_eq!(cfg.release, ReleaseMode::FromAcquisition);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let cfg = RateLimiterConfig::new(0, Duration::from_secs(1));
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn rejects_zero_window() {
        let cfg = RateLimiterConfig::new(3, Duration::ZERO);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn rejects_capacity_above_semaphore_limit() {
        let cfg = RateLimiterConfig::new(MAX_CAPACITY + 1, Duration::from_secs(1));
        assert!(matches!(cfg.validate(), Err(ConfigError::CapacityTooLarge { .. })));
    }

    #[test]
    fn deserializes_release_mode() {
        let cfg: RateLimiterConfig = serde_json::from_str(
            r#"{ "capacity": 2, "window_ms": 250, "release": "after_completion" }"#,
        )
        .expect("valid config");
        assert_eq!(cfg.capacity, 2);
        assert_eq!(cfg.window, Duration::from_millis(250));
        assert_eq!(cfg.release, ReleaseMode::AfterCompletion);
    }

    #[test]
    fn serializes_window_as_millis() {
        let cfg = RateLimiterConfig::new(1, Duration::from_millis(1500));
        let json = serde_json::to_value(cfg).expect("serialize");
        assert_eq!(json["window_ms"], 1500);
        assert_eq!(json["release"], "from_acquisition");
    }
}
