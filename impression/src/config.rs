//! Configuration for the impression tracker.
//!
//! An [`ImpressionConfig`] is fixed for the lifetime of a tracker. It can be
//! built in code from the defaults, or read from the `[impression]` section of
//! an INI file:
//!
//! ```ini
//! [impression]
//! impression_duration_ms = 1000
//! check_interval_ms = 1000
//! visible_ratio = 0.5
//! event_capacity = 64
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::error::ConfigError;

// ==================== Defaults ====================

/// Default time an element must stay visible before it counts as impressed.
pub const DEFAULT_IMPRESSION_DURATION: Duration = Duration::from_millis(1000);

/// Default period between evaluation cycles.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// Default fraction of an element's area that must be inside the viewport.
pub const DEFAULT_VISIBLE_RATIO: f32 = 0.5;

/// Default number of undelivered events a subscriber may fall behind by.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// INI section holding tracker settings.
pub const CONFIG_SECTION: &str = "impression";

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpressionConfig {
    /// Continuous visible time required for an impression.
    ///
    /// Zero means an element is impressed on the first evaluation cycle after
    /// it becomes visible.
    pub impression_duration: Duration,

    /// Period between evaluation cycles. Must be non-zero.
    pub check_interval: Duration,

    /// Minimum visible fraction of the element's own area, in `[0, 1]`.
    /// The boundary counts as visible.
    pub visible_ratio: f32,

    /// Broadcast buffer per subscriber.
    ///
    /// A subscriber that falls further behind than this loses the oldest
    /// events rather than stalling the evaluation loop.
    pub event_capacity: usize,
}

impl Default for ImpressionConfig {
    fn default() -> Self {
        Self {
            impression_duration: DEFAULT_IMPRESSION_DURATION,
            check_interval: DEFAULT_CHECK_INTERVAL,
            visible_ratio: DEFAULT_VISIBLE_RATIO,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ImpressionConfig {
    pub fn with_impression_duration(mut self, duration: Duration) -> Self {
        self.impression_duration = duration;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_visible_ratio(mut self, ratio: f32) -> Self {
        self.visible_ratio = ratio;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.visible_ratio) {
            return Err(ConfigError::InvalidVisibleRatio(self.visible_ratio));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Load and validate the `[impression]` section of an INI file.
    ///
    /// Keys missing from the file keep their defaults, and so does a file with
    /// no `[impression]` section at all.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&text)
    }

    /// Parse and validate INI text. See [`ImpressionConfig::from_ini_file`].
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(CONFIG_SECTION)) {
            if let Some(value) = section.get("impression_duration_ms") {
                config.impression_duration =
                    Duration::from_millis(parse_value("impression_duration_ms", value)?);
            }
            if let Some(value) = section.get("check_interval_ms") {
                config.check_interval =
                    Duration::from_millis(parse_value("check_interval_ms", value)?);
            }
            if let Some(value) = section.get("visible_ratio") {
                config.visible_ratio = parse_value("visible_ratio", value)?;
            }
            if let Some(value) = section.get("event_capacity") {
                config.event_capacity = parse_value("event_capacity", value)?;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
