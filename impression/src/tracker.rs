//! The impression tracker.
//!
//! Observed elements report their geometry whenever layout changes. The
//! tracker keeps two tables behind a single lock:
//!
//! - **visible**: keys that are sufficiently visible right now, stamped with
//!   the time they became visible
//! - **impressed**: keys that stayed visible long enough, stamped with the
//!   evaluation cycle that promoted them
//!
//! An evaluation cycle ([`ImpressionTracker::run_cycle`]) promotes every
//! visible key whose visible time has reached the configured duration,
//! publishing each one exactly once. The background loop in
//! [`crate::runtime`] runs a cycle every `check_interval`.
//!
//! # State Machine
//!
//! ```text
//! (untracked) --[report >= ratio]--> Visible
//! Visible --[report < ratio | outside | dispose]--> (untracked)
//! Visible --[cycle: visible_for >= duration]--> Impressed
//! Impressed --[clear]--> (untracked)
//! ```
//!
//! Repeated visible reports do not restart a key's timer: the duration
//! measured is "continuously visible since", not "visible right now".

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::ImpressionConfig;
use crate::error::ConfigError;
use crate::events::ImpressionEvents;
use crate::geometry::{Rect, Size, Visibility};
use crate::model::{ImpressionRecord, VisibilityRecord};

/// Bounds every tracked key must satisfy.
///
/// Blanket-implemented, so any hashable, cloneable, thread-safe value works:
/// string ids, integers, tuples, small enums.
pub trait TrackerKey: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> TrackerKey for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Contract between the tracker and whatever reports geometry to it.
///
/// UI glue can hold an `Arc<dyn ImpressionState<K>>` instead of the concrete
/// tracker.
pub trait ImpressionState<K>: Send + Sync {
    /// An element's position or size changed.
    fn on_layout_change(&self, key: K, size: Size, bounds: &Rect, viewport: &Rect);

    /// An element left the observable tree.
    fn on_dispose(&self, key: &K);

    /// Subscribe to impressions recorded from now on.
    fn subscribe(&self) -> ImpressionEvents<K>;
}

/// A visibility record plus its insertion order.
#[derive(Debug, Clone)]
struct VisibleEntry<K> {
    record: VisibilityRecord<K>,
    seq: u64,
}

/// Everything guarded by the tracker's lock.
#[derive(Debug)]
struct TrackerState<K> {
    visible: HashMap<K, VisibleEntry<K>>,
    impressed: HashMap<K, ImpressionRecord<K>>,
    /// Last evaluated cycle; `None` before the first one.
    cycle: Option<u64>,
    next_seq: u64,
}

impl<K: TrackerKey> TrackerState<K> {
    fn new() -> Self {
        Self {
            visible: HashMap::new(),
            impressed: HashMap::new(),
            cycle: None,
            next_seq: 0,
        }
    }

    fn insert_visible(&mut self, key: K, now: std::time::Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.visible.insert(
            key.clone(),
            VisibleEntry {
                record: VisibilityRecord::new(key, now),
                seq,
            },
        );
    }
}

/// Tracks which keys have been visible long enough to count as impressed.
///
/// Share it behind an `Arc`: reporters call [`report_geometry`] and
/// [`dispose`] from any thread while the loop started with
/// [`start`] promotes keys in the background.
///
/// # Example
///
/// ```
/// use impression::{ImpressionConfig, ImpressionTracker, ManualClock, Rect, Size};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new());
/// let tracker = ImpressionTracker::with_clock(ImpressionConfig::default(), clock.clone())
///     .unwrap();
///
/// let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
/// tracker.report_geometry("banner", Size::new(10, 10), &rect, &rect);
///
/// clock.advance(Duration::from_millis(1000));
/// let promoted = tracker.run_cycle();
/// assert_eq!(promoted[0].key, "banner");
/// assert!(tracker.is_impressed(&"banner"));
/// ```
///
/// [`report_geometry`]: ImpressionTracker::report_geometry
/// [`dispose`]: ImpressionTracker::dispose
/// [`start`]: ImpressionTracker::start
pub struct ImpressionTracker<K: TrackerKey> {
    config: ImpressionConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<TrackerState<K>>,
    events: broadcast::Sender<ImpressionRecord<K>>,
    /// Set once the background loop has been spawned.
    pub(crate) started: AtomicBool,
}

impl<K: TrackerKey> std::fmt::Debug for ImpressionTracker<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ImpressionTracker")
            .field("config", &self.config)
            .field("visible", &state.visible.len())
            .field("impressed", &state.impressed.len())
            .field("cycle", &state.cycle)
            .finish_non_exhaustive()
    }
}

impl<K: TrackerKey> ImpressionTracker<K> {
    /// Create a tracker reading the wall clock.
    pub fn new(config: ImpressionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with the default configuration.
    pub fn with_defaults() -> Self {
        Self::build(ImpressionConfig::default(), Arc::new(SystemClock))
    }

    /// Create a tracker reading the given clock.
    pub fn with_clock(
        config: ImpressionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: ImpressionConfig, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            config,
            clock,
            state: Mutex::new(TrackerState::new()),
            events,
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ImpressionConfig {
        &self.config
    }

    /// Record an element's latest geometry.
    ///
    /// `bounds` and `viewport` must share a coordinate space. Keys that are
    /// already impressed are ignored. Otherwise the key becomes (or stays)
    /// visible if at least `visible_ratio` of its area lies inside the
    /// viewport, keeping its first timestamp when it was already visible.
    /// Any other outcome, including degenerate sizes, removes it from the
    /// visible table.
    pub fn report_geometry(&self, key: K, size: Size, bounds: &Rect, viewport: &Rect) {
        let visibility = Visibility::measure(size, bounds, viewport);
        let mut state = self.state.lock();

        if state.impressed.contains_key(&key) {
            return;
        }

        if visibility.meets(self.config.visible_ratio) {
            if !state.visible.contains_key(&key) {
                let now = self.clock.now();
                trace!(
                    visible_since_ms = now.as_millis() as u64,
                    visibility = ?visibility,
                    "Key became visible"
                );
                state.insert_visible(key, now);
            }
        } else if state.visible.remove(&key).is_some() {
            trace!(visibility = ?visibility, "Key lost visibility");
        }
    }

    /// Forget a key's visibility, e.g. when its element is removed.
    ///
    /// An impressed key stays impressed.
    pub fn dispose(&self, key: &K) {
        self.state.lock().visible.remove(key);
    }

    /// Reset both tables.
    ///
    /// Previously impressed keys can be impressed again afterwards. The cycle
    /// counter keeps counting.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        debug!(
            visible = state.visible.len(),
            impressed = state.impressed.len(),
            "Clearing impression state"
        );
        state.visible.clear();
        state.impressed.clear();
    }

    /// Reset only the impressed table, leaving visible timers running.
    pub fn clear_impressed(&self) {
        let mut state = self.state.lock();
        debug!(impressed = state.impressed.len(), "Clearing impressed keys");
        state.impressed.clear();
    }

    /// Restamp every visible key with the current time.
    ///
    /// Call this when the host comes back to the foreground so time spent in
    /// the background does not count towards an impression.
    pub fn restart_visible_timers(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        for entry in state.visible.values_mut() {
            entry.record.visible_since = now;
        }
    }

    /// Run one evaluation cycle and return the keys it promoted.
    ///
    /// Every visible key whose visible time has reached the impression
    /// duration is moved to the impressed table and published, in the order
    /// the keys became visible. The background loop calls this on every tick;
    /// embedders with their own scheduler may call it directly.
    pub fn run_cycle(&self) -> Vec<ImpressionRecord<K>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let cycle = state.cycle.map_or(0, |c| c + 1);
        state.cycle = Some(cycle);

        let now = self.clock.now();
        let duration = self.config.impression_duration;

        let mut due: Vec<(u64, K)> = state
            .visible
            .iter()
            .filter(|(key, entry)| {
                entry.record.visible_for(now) >= duration && !state.impressed.contains_key(*key)
            })
            .map(|(key, entry)| (entry.seq, key.clone()))
            .collect();
        due.sort_unstable_by_key(|(seq, _)| *seq);

        let mut promoted = Vec::with_capacity(due.len());
        for (_, key) in due {
            state.visible.remove(&key);
            let record = ImpressionRecord::new(key.clone(), cycle);
            // No subscribers is fine: the event is fire-and-forget.
            let _ = self.events.send(record.clone());
            state.impressed.insert(key, record.clone());
            promoted.push(record);
        }

        if !promoted.is_empty() {
            debug!(
                cycle,
                count = promoted.len(),
                still_visible = state.visible.len(),
                "Impressions recorded"
            );
        }

        promoted
    }

    /// Subscribe to impressions recorded from now on.
    pub fn subscribe(&self) -> ImpressionEvents<K> {
        ImpressionEvents::new(self.events.subscribe())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Copy of the visible table.
    pub fn visible_items(&self) -> HashMap<K, VisibilityRecord<K>> {
        self.state
            .lock()
            .visible
            .iter()
            .map(|(key, entry)| (key.clone(), entry.record.clone()))
            .collect()
    }

    /// Copy of the impressed table.
    pub fn impressed_items(&self) -> HashMap<K, ImpressionRecord<K>> {
        self.state.lock().impressed.clone()
    }

    pub fn is_visible(&self, key: &K) -> bool {
        self.state.lock().visible.contains_key(key)
    }

    pub fn is_impressed(&self, key: &K) -> bool {
        self.state.lock().impressed.contains_key(key)
    }

    /// Last evaluated cycle, or `None` if no cycle has run yet.
    pub fn current_cycle(&self) -> Option<u64> {
        self.state.lock().cycle
    }
}

impl<K: TrackerKey> ImpressionState<K> for ImpressionTracker<K> {
    fn on_layout_change(&self, key: K, size: Size, bounds: &Rect, viewport: &Rect) {
        self.report_geometry(key, size, bounds, viewport);
    }

    fn on_dispose(&self, key: &K) {
        self.dispose(key);
    }

    fn subscribe(&self) -> ImpressionEvents<K> {
        ImpressionTracker::subscribe(self)
    }
}
