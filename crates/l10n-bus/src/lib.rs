// SPDX-License-Identifier: MIT OR Apache-2.0
//! Broadcast-based event bus for decoupled [`CatalogEvent`] distribution.
//!
//! Delivery is best-effort, at-most-once per subscriber: the bus keeps no
//! history, a full channel surfaces to slow subscribers as counted lag, and
//! publishing never blocks the writer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use l10n_core::CatalogEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 256;

/// Shared statistics counters for an [`EventBus`].
#[derive(Debug, Default)]
struct StatsInner {
    total_published: AtomicU64,
    dropped_events: AtomicU64,
}

/// Broadcast-based event bus for distributing [`CatalogEvent`]s to multiple
/// subscribers with built-in statistics tracking.
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    stats: Arc<StatsInner>,
}

impl EventBus {
    /// Create a new event bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            stats: Arc::new(StatsInner::default()),
        }
    }

    /// Create a new [`EventSubscription`] that receives future events.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If no subscribers are listening the event is silently dropped and
    /// counted in [`EventBusStats::dropped_events`].
    pub fn publish(&self, event: CatalogEvent) {
        self.stats.total_published.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(event).is_err() {
            self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Return a snapshot of the current bus statistics.
    #[must_use]
    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_published: self.stats.total_published.load(Ordering::Relaxed),
            active_subscribers: self.tx.receiver_count(),
            dropped_events: self.stats.dropped_events.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for receiving events from an [`EventBus`].
pub struct EventSubscription {
    rx: broadcast::Receiver<CatalogEvent>,
    stats: Arc<StatsInner>,
}

impl EventSubscription {
    /// Receive the next event, waiting asynchronously.
    ///
    /// Returns `None` when the bus is closed. Lagged events are counted in
    /// [`EventBusStats::dropped_events`] and reception continues with the
    /// next available event.
    pub async fn recv(&mut self) -> Option<CatalogEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.stats.dropped_events.fetch_add(n, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is available, the channel is closed, or
    /// the subscriber lagged with nothing newer buffered.
    pub fn try_recv(&mut self) -> Option<CatalogEvent> {
        match self.rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                self.stats.dropped_events.fetch_add(n, Ordering::Relaxed);
                self.rx.try_recv().ok()
            }
            Err(_) => None,
        }
    }
}

/// Snapshot of event bus statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusStats {
    /// Total number of events published to the bus.
    pub total_published: u64,
    /// Number of subscribers currently listening.
    pub active_subscribers: usize,
    /// Events lost because no subscribers were listening or a subscriber
    /// lagged.
    pub dropped_events: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use l10n_core::EventKind;
    use uuid::Uuid;

    fn language_deleted(code: &str) -> CatalogEvent {
        CatalogEvent::now(EventKind::LanguageDeleted {
            language_id: Uuid::nil(),
            code: code.into(),
        })
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(language_deleted("en"));
        let ev = sub.recv().await.unwrap();
        assert_eq!(ev.kind.type_name(), "language.deleted");
    }

    #[tokio::test]
    async fn all_subscribers_receive_each_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(language_deleted("de"));
        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn single_writer_order_is_preserved() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        for code in ["aa", "bb", "cc"] {
            bus.publish(language_deleted(code));
        }
        for code in ["aa", "bb", "cc"] {
            let ev = sub.recv().await.unwrap();
            assert_eq!(ev.kind.language_code(), Some(code));
        }
    }

    #[test]
    fn publish_without_subscribers_counts_drop() {
        let bus = EventBus::new();
        bus.publish(language_deleted("en"));
        let stats = bus.stats();
        assert_eq!(stats.total_published, 1);
        assert_eq!(stats.dropped_events, 1);
        assert_eq!(stats.active_subscribers, 0);
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_but_continues() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for i in 0..10 {
            bus.publish(language_deleted(&format!("l{i}")));
        }
        // The oldest events are gone; reception resumes at the tail.
        let ev = sub.recv().await.unwrap();
        assert!(ev.kind.language_code().unwrap().starts_with('l'));
        assert!(bus.stats().dropped_events > 0);
    }

    #[test]
    fn try_recv_on_empty_returns_none() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn subscriber_count_tracks_lifecycle() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
