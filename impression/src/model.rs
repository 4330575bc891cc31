//! Records held in the tracker's two tables.
//!
//! A key lives in at most one table at a time: it is either visible and
//! waiting out its impression duration, already impressed, or neither.

use std::time::Duration;

/// A key that is currently sufficiently visible but not yet impressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityRecord<K> {
    pub key: K,
    /// Clock reading when the key most recently became sufficiently visible.
    pub visible_since: Duration,
}

impl<K> VisibilityRecord<K> {
    pub fn new(key: K, visible_since: Duration) -> Self {
        Self { key, visible_since }
    }

    /// How long the key has been visible as of `now`.
    ///
    /// Saturates at zero if the clock reads earlier than `visible_since`.
    pub fn visible_for(&self, now: Duration) -> Duration {
        now.saturating_sub(self.visible_since)
    }
}

/// A key that has been impressed.
///
/// This is also the payload published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpressionRecord<K> {
    pub key: K,
    /// Evaluation cycle in which the impression was recorded.
    pub cycle: u64,
}

impl<K> ImpressionRecord<K> {
    pub fn new(key: K, cycle: u64) -> Self {
        Self { key, cycle }
    }
}
