//! Subscriptions to impression events.
//!
//! Events travel over a bounded `tokio::sync::broadcast` channel:
//!
//! - Publishing never blocks the evaluation loop.
//! - With no subscriber the event is simply dropped.
//! - A subscriber only sees impressions recorded after it subscribed.
//! - A subscriber that falls more than the configured capacity behind skips
//!   the oldest events and carries on.

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::model::ImpressionRecord;

/// Receiver for every impression recorded by one tracker.
#[derive(Debug)]
pub struct ImpressionEvents<K> {
    rx: broadcast::Receiver<ImpressionRecord<K>>,
}

impl<K: Clone + Send + 'static> ImpressionEvents<K> {
    pub(crate) fn new(rx: broadcast::Receiver<ImpressionRecord<K>>) -> Self {
        Self { rx }
    }

    /// Wait for the next impression.
    ///
    /// Returns `None` once the tracker has been dropped and every buffered
    /// event has been delivered.
    pub async fn recv(&mut self) -> Option<ImpressionRecord<K>> {
        loop {
            match self.rx.recv().await {
                Ok(record) => return Some(record),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Impression subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already delivered impression without waiting.
    pub fn try_recv(&mut self) -> Option<ImpressionRecord<K>> {
        loop {
            match self.rx.try_recv() {
                Ok(record) => return Some(record),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Impression subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Narrow this subscription to a single key.
    pub fn for_key(self, key: K) -> KeyedImpressionEvents<K>
    where
        K: PartialEq,
    {
        KeyedImpressionEvents { inner: self, key }
    }

    /// Adapt the subscription into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = ImpressionRecord<K>> {
        stream::unfold(self, |mut events| async move {
            events.recv().await.map(|record| (record, events))
        })
    }
}

/// Subscription that only yields impressions of one key.
///
/// This is what a single observed element listens on: the shared stream
/// filtered down to its own key.
#[derive(Debug)]
pub struct KeyedImpressionEvents<K> {
    inner: ImpressionEvents<K>,
    key: K,
}

impl<K: Clone + PartialEq + Send + 'static> KeyedImpressionEvents<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Wait for the next impression of this key.
    pub async fn recv(&mut self) -> Option<ImpressionRecord<K>> {
        while let Some(record) = self.inner.recv().await {
            if record.key == self.key {
                return Some(record);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    type Sender = broadcast::Sender<ImpressionRecord<&'static str>>;

    fn channel(capacity: usize) -> (Sender, ImpressionEvents<&'static str>) {
        let (tx, rx) = broadcast::channel(capacity);
        (tx, ImpressionEvents::new(rx))
    }

    #[tokio::test]
    async fn test_recv_in_publish_order() {
        let (tx, mut events) = channel(8);
        tx.send(ImpressionRecord::new("a", 0)).unwrap();
        tx.send(ImpressionRecord::new("b", 0)).unwrap();

        assert_eq!(events.recv().await, Some(ImpressionRecord::new("a", 0)));
        assert_eq!(events.recv().await, Some(ImpressionRecord::new("b", 0)));
    }

    #[tokio::test]
    async fn test_recv_none_after_sender_dropped() {
        let (tx, mut events) = channel(8);
        tx.send(ImpressionRecord::new("a", 3)).unwrap();
        drop(tx);

        assert_eq!(events.recv().await, Some(ImpressionRecord::new("a", 3)));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_oldest() {
        let (tx, mut events) = channel(2);
        for cycle in 0..5 {
            tx.send(ImpressionRecord::new("k", cycle)).unwrap();
        }

        // Only the newest two survive.
        assert_eq!(events.recv().await.map(|r| r.cycle), Some(3));
        assert_eq!(events.recv().await.map(|r| r.cycle), Some(4));
    }

    #[test]
    fn test_try_recv_empty() {
        let (_tx, mut events) = channel(2);
        assert_eq!(events.try_recv(), None);
    }

    #[tokio::test]
    async fn test_keyed_subscription_filters() {
        let (tx, events) = channel(8);
        let mut keyed = events.for_key("b");
        tx.send(ImpressionRecord::new("a", 0)).unwrap();
        tx.send(ImpressionRecord::new("b", 1)).unwrap();
        drop(tx);

        assert_eq!(keyed.key(), &"b");
        assert_eq!(keyed.recv().await, Some(ImpressionRecord::new("b", 1)));
        assert_eq!(keyed.recv().await, None);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (tx, events) = channel(8);
        tx.send(ImpressionRecord::new("a", 0)).unwrap();
        tx.send(ImpressionRecord::new("b", 0)).unwrap();
        drop(tx);

        let keys: Vec<_> = events.into_stream().map(|r| r.key).collect().await;
        assert_eq!(keys, vec!["a", "b"]);
    }
}
