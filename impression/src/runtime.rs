//! Background evaluation loop.
//!
//! [`ImpressionTracker::start`] spawns a tokio task that runs an evaluation
//! cycle, then sleeps for `check_interval`, until it is cancelled. The sleep
//! is the loop's only suspension point and races against a
//! [`CancellationToken`], so stopping never waits out a full interval.
//!
//! # Example
//!
//! ```ignore
//! let tracker = Arc::new(ImpressionTracker::<String>::with_defaults());
//! let mut events = tracker.subscribe();
//! let handle = tracker.start()?;
//!
//! // Reporters call tracker.report_geometry(..) as layout changes.
//! while let Some(impression) = events.recv().await {
//!     println!("seen: {}", impression.key);
//! }
//!
//! handle.stop();
//! handle.join().await;
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::tracker::{ImpressionTracker, TrackerKey};

/// Handle to a running evaluation loop.
///
/// Dropping the handle stops the loop.
#[derive(Debug)]
pub struct ImpressionLoop {
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ImpressionLoop {
    /// Ask the loop to stop. Safe to call more than once.
    pub fn stop(&self) {
        if !self.cancellation.is_cancelled() {
            info!("Impression loop stop requested");
            self.cancellation.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Token that cancels the loop, for tying it to a wider shutdown.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Wait for the loop task to exit.
    ///
    /// Does not stop the loop by itself; call [`stop`](Self::stop) first or
    /// cancel the token.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ImpressionLoop {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

impl<K: TrackerKey> ImpressionTracker<K> {
    /// Spawn the evaluation loop on the current tokio runtime.
    ///
    /// A tracker runs at most one loop in its lifetime: a second call fails
    /// with [`TrackerError::AlreadyStarted`], even after the first loop was
    /// stopped.
    pub fn start(self: &Arc<Self>) -> Result<ImpressionLoop, TrackerError> {
        self.start_with_cancellation(CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `cancellation` fires.
    ///
    /// Pass a child of an application-wide token to stop the loop on
    /// shutdown.
    pub fn start_with_cancellation(
        self: &Arc<Self>,
        cancellation: CancellationToken,
    ) -> Result<ImpressionLoop, TrackerError> {
        let runtime = Handle::try_current()?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TrackerError::AlreadyStarted);
        }

        let task = runtime.spawn(run_loop(Arc::clone(self), cancellation.clone()));

        Ok(ImpressionLoop {
            cancellation,
            task: Some(task),
        })
    }

    /// Whether a loop has ever been started for this tracker.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

async fn run_loop<K: TrackerKey>(
    tracker: Arc<ImpressionTracker<K>>,
    shutdown: CancellationToken,
) {
    let interval = tracker.config().check_interval;
    info!(
        interval_ms = interval.as_millis() as u64,
        duration_ms = tracker.config().impression_duration.as_millis() as u64,
        visible_ratio = tracker.config().visible_ratio,
        "Impression loop starting"
    );

    while !shutdown.is_cancelled() {
        tracker.run_cycle();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("Impression loop cancelled during sleep");
                break;
            }

            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(cycle = ?tracker.current_cycle(), "Impression loop stopped");
}
