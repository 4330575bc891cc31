//! Tracing setup for applications embedding the tracker.
//!
//! The library itself only emits `tracing` events. Binaries that want them
//! on screen (and optionally in a daily-rolling log file) call
//! [`init_logging`] once at startup and keep the returned guard alive.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::LoggingError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "impression=info";

/// Default file name prefix for rolling log files.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "impression.log";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive applied when `RUST_LOG` is not set.
    pub default_directive: String,
    /// Directory for daily-rolling log files; console only when `None`.
    pub log_dir: Option<PathBuf>,
    /// File name prefix inside `log_dir`.
    pub file_prefix: String,
    /// Colourise console output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
            log_dir: None,
            file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Filter from `RUST_LOG`, falling back to `default_directive`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// Install the global tracing subscriber.
///
/// Returns the file writer's guard when `log_dir` is set; dropping it flushes
/// and stops the background writer. Fails if a global subscriber already
/// exists.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let console = fmt::layer().with_target(true).with_ansi(config.ansi);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_writer(writer).with_ansi(false);

            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(console)
                .with(file)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(console)
                .try_init()?;
            Ok(None)
        }
    }
}
