//! Error types for the impression tracker.
//!
//! Tracking itself never fails: bad geometry degrades to "not visible".
//! Errors only arise at the edges, when building a configuration or
//! starting the background loop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating an [`ImpressionConfig`].
///
/// [`ImpressionConfig`]: crate::ImpressionConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The visible ratio is outside `[0, 1]` or not a number.
    #[error("visible_ratio must be within [0, 1], got {0}")]
    InvalidVisibleRatio(f32),

    /// The check interval is zero, which would make the loop spin.
    #[error("check_interval must be greater than zero")]
    ZeroCheckInterval,

    /// The event channel needs room for at least one event.
    #[error("event_capacity must be greater than zero")]
    ZeroEventCapacity,

    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A key holds a value of the wrong type.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors raised by the tracker's lifecycle operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The background loop was already started for this tracker.
    #[error("Impression loop already started")]
    AlreadyStarted,

    /// `start` was called outside a tokio runtime.
    #[error("No tokio runtime available to spawn the impression loop")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidVisibleRatio(1.5);
        assert_eq!(err.to_string(), "visible_ratio must be within [0, 1], got 1.5");

        let err = ConfigError::InvalidValue {
            key: "check_interval_ms",
            value: "soon".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for check_interval_ms: \"soon\""
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err = ConfigError::Io {
            path: PathBuf::from("/missing.ini"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/missing.ini"));
    }

    #[test]
    fn test_tracker_error_display() {
        assert_eq!(
            TrackerError::AlreadyStarted.to_string(),
            "Impression loop already started"
        );
    }
}
