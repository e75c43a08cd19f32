//! Engine configuration
//!
//! Defaults mirror the live extension. Every field can be overridden from a
//! TOML file; missing fields keep their defaults.

use crate::error::{EngineError, Result};
use crate::host::HostContract;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of one animation frame
    pub frame_interval_ms: u64,
    /// Delay before a deferred schedule save retries
    pub save_retry_ms: u64,
    /// Per-course assignment list TTL
    pub quick_ttl_ms: u64,
    /// Whole-site scan result TTL
    pub bulk_ttl_ms: u64,
    /// Submission status TTL
    pub submission_ttl_ms: u64,
    /// Poll interval while waiting on another context's scan
    pub scan_poll_ms: u64,
    /// Age after which a scanning flag is considered abandoned
    pub scan_stale_ms: u64,
    /// Entries held by the in-memory front cache
    pub front_cache_capacity: u64,
    /// Image shown on cards without a host image
    pub placeholder_url: String,
    /// Overdue window used when the store has no value
    pub default_max_overdue_days: u32,
    /// Offset of the calendar's days from UTC, in minutes
    pub utc_offset_minutes: i32,
    /// Host page selectors
    pub host: HostContract,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            save_retry_ms: 200,
            quick_ttl_ms: 5 * MINUTE_MS,
            bulk_ttl_ms: 7 * DAY_MS,
            submission_ttl_ms: 7 * DAY_MS,
            scan_poll_ms: 1000,
            scan_stale_ms: 10 * MINUTE_MS,
            front_cache_capacity: 1024,
            placeholder_url: "assets/placeholder.svg".to_string(),
            default_max_overdue_days: 30,
            utc_offset_minutes: 0,
            host: HostContract::default(),
        }
    }
}

impl EngineConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check values that would stall timers or break selectors
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval_ms == 0 {
            return Err(EngineError::Config("frame_interval_ms must be positive".into()));
        }
        if self.save_retry_ms == 0 || self.scan_poll_ms == 0 {
            return Err(EngineError::Config("retry and poll intervals must be positive".into()));
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(EngineError::Config(format!(
                "utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        self.host.compile()?;
        Ok(())
    }

    /// Set frame interval
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = millis(interval);
        self
    }

    /// Set save retry interval
    #[must_use]
    pub fn with_save_retry(mut self, interval: Duration) -> Self {
        self.save_retry_ms = millis(interval);
        self
    }

    /// Set the per-course TTL
    #[must_use]
    pub fn with_quick_ttl(mut self, ttl: Duration) -> Self {
        self.quick_ttl_ms = millis(ttl);
        self
    }

    /// Set the bulk scan TTL
    #[must_use]
    pub fn with_bulk_ttl(mut self, ttl: Duration) -> Self {
        self.bulk_ttl_ms = millis(ttl);
        self
    }

    /// Set scan polling and staleness
    #[must_use]
    pub fn with_scan_timing(mut self, poll: Duration, stale_after: Duration) -> Self {
        self.scan_poll_ms = millis(poll);
        self.scan_stale_ms = millis(stale_after);
        self
    }

    /// Set placeholder image URL
    #[must_use]
    pub fn with_placeholder(mut self, url: impl Into<String>) -> Self {
        self.placeholder_url = url.into();
        self
    }

    /// Set the calendar's offset from UTC
    #[must_use]
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Replace the host contract
    #[must_use]
    pub fn with_host(mut self, host: HostContract) -> Self {
        self.host = host;
        self
    }

    /// Frame interval
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Save retry interval
    #[must_use]
    pub fn save_retry(&self) -> Duration {
        Duration::from_millis(self.save_retry_ms)
    }

    /// Scan poll interval
    #[must_use]
    pub fn scan_poll(&self) -> Duration {
        Duration::from_millis(self.scan_poll_ms)
    }

    /// Calendar offset; UTC if out of range
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_live_values() {
        let config = EngineConfig::default();
        assert_eq!(config.quick_ttl_ms, 300_000);
        assert_eq!(config.bulk_ttl_ms, 604_800_000);
        assert_eq!(config.default_max_overdue_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_are_partial() {
        let config = EngineConfig::from_toml_str(
            r#"
            save_retry_ms = 50

            [host]
            front_page_body_id = "page-home"
            "#,
        )
        .unwrap();
        assert_eq!(config.save_retry(), Duration::from_millis(50));
        assert_eq!(config.host.front_page_body_id, "page-home");
        assert_eq!(config.frame_interval_ms, 16);
        assert!(!config.host.containers.is_empty());
    }

    #[test]
    fn utc_offset_is_bounded() {
        let config = EngineConfig::default().with_utc_offset_minutes(180);
        assert_eq!(config.utc_offset().local_minus_utc(), 3 * 3600);
        assert!(config.validate().is_ok());
        assert!(EngineConfig::from_toml_str("utc_offset_minutes = 900").is_err());
    }

    #[test]
    fn bad_selector_is_rejected() {
        let err = EngineConfig::from_toml_str("[host]\ncards = \"a >\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Dom(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = EngineConfig::new().with_frame_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reskin.toml");
        std::fs::write(&path, "scan_poll_ms = 5\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().scan_poll_ms, 5);
    }
}
