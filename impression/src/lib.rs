//! Impression - fire-once visibility tracking
//!
//! This library decides when an observed element has been "seen": visible by
//! at least a given fraction of its area, continuously, for at least a given
//! duration. Each element is reported exactly once until the tracker is
//! reset.
//!
//! # Architecture
//!
//! ```text
//! Layout system ──► report_geometry / dispose ──► ImpressionTracker
//!                                                 (visible + impressed tables)
//!                                                        │
//!                       ImpressionLoop (every check_interval) ─► run_cycle
//!                                                        │
//!                                   broadcast ◄──────────┘
//!                                       │
//!                                       ▼
//!                              ImpressionEvents (subscribers)
//! ```
//!
//! The tracker never computes layout. It consumes pre-computed rectangles in
//! a shared coordinate space, reads time from an injectable [`Clock`], and
//! publishes [`ImpressionRecord`]s on a bounded broadcast channel that never
//! blocks the loop.
//!
//! # Example
//!
//! ```no_run
//! use impression::{ImpressionConfig, ImpressionTracker, Rect, Size};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = Arc::new(ImpressionTracker::<u64>::new(ImpressionConfig::default())?);
//! let mut events = tracker.subscribe();
//! let handle = tracker.start()?;
//!
//! // Called by the layout system whenever item 7 moves.
//! let bounds = Rect::new(0.0, 100.0, 300.0, 400.0);
//! let viewport = Rect::new(0.0, 0.0, 1080.0, 1920.0);
//! tracker.report_geometry(7, Size::new(300, 300), &bounds, &viewport);
//!
//! if let Some(impression) = events.recv().await {
//!     println!("item {} seen in cycle {}", impression.key, impression.cycle);
//! }
//!
//! handle.stop();
//! handle.join().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ImpressionConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_EVENT_CAPACITY, DEFAULT_IMPRESSION_DURATION,
    DEFAULT_VISIBLE_RATIO,
};
pub use error::{ConfigError, LoggingError, TrackerError};
pub use events::{ImpressionEvents, KeyedImpressionEvents};
pub use geometry::{Rect, Size, Visibility};
pub use logging::{init_logging, LoggingConfig};
pub use model::{ImpressionRecord, VisibilityRecord};
pub use runtime::ImpressionLoop;
pub use tracker::{ImpressionState, ImpressionTracker, TrackerKey};
