// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming subscription manager.
//!
//! Maintains the set of live subscribers, evaluates per-subscriber filters
//! against every bus event, and writes matches into bounded per-subscriber
//! queues. A subscriber whose queue is full at write time is dropped — not
//! the event — which preserves the global fan-out rate and isolates slow
//! consumers; the client is expected to reconnect.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod protocol;

pub use protocol::{ClientMessage, ControlMessage, SubscriptionSpec};

use l10n_bus::EventBus;
use l10n_core::CatalogEvent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the subscribe step.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The subscriber id is not registered (already dropped or closed).
    #[error("unknown subscriber")]
    UnknownSubscriber,
    /// A requested event type is not in the taxonomy.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

// ---------------------------------------------------------------------------
// Subscriber bookkeeping
// ---------------------------------------------------------------------------

struct SubscriberHandle {
    username: String,
    is_admin: bool,
    specs: Vec<SubscriptionSpec>,
    tx: mpsc::Sender<CatalogEvent>,
}

impl SubscriberHandle {
    fn wants(&self, event: &CatalogEvent) -> bool {
        if event.kind.admin_only() && !self.is_admin {
            return false;
        }
        self.specs.iter().any(|spec| spec.matches(event))
    }
}

// ---------------------------------------------------------------------------
// SubscriptionManager
// ---------------------------------------------------------------------------

/// Registry of live subscribers plus the fan-out loop.
///
/// The subscriber set is behind a reader-preferring lock: fan-out takes the
/// read side, connection add/remove takes the write side.
pub struct SubscriptionManager {
    subscribers: RwLock<HashMap<Uuid, SubscriberHandle>>,
    queue_capacity: usize,
}

impl SubscriptionManager {
    /// Create a manager whose per-subscriber queues hold `queue_capacity`
    /// events.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register an authenticated connection. Returns the subscriber id and
    /// the outbound event queue; the transport owns the receiving end and
    /// the connection is considered closed when it drops.
    pub fn register(
        &self,
        username: impl Into<String>,
        is_admin: bool,
    ) -> (Uuid, mpsc::Receiver<CatalogEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let handle = SubscriberHandle {
            username: username.into(),
            is_admin,
            specs: Vec::new(),
            tx,
        };
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .insert(id, handle);
        debug!(subscriber = %id, "subscriber registered");
        (id, rx)
    }

    /// Record one subscription spec for `id`. A connection may subscribe
    /// repeatedly; an event is delivered when any spec matches.
    pub fn subscribe(&self, id: Uuid, spec: SubscriptionSpec) -> Result<(), SubscribeError> {
        spec.validate()?;
        let mut subscribers = self.subscribers.write().expect("subscriber lock poisoned");
        let handle = subscribers
            .get_mut(&id)
            .ok_or(SubscribeError::UnknownSubscriber)?;
        handle.specs.push(spec);
        Ok(())
    }

    /// Drop every subscription spec of `id`, keeping the connection open.
    pub fn unsubscribe(&self, id: Uuid) -> Result<(), SubscribeError> {
        let mut subscribers = self.subscribers.write().expect("subscriber lock poisoned");
        let handle = subscribers
            .get_mut(&id)
            .ok_or(SubscribeError::UnknownSubscriber)?;
        handle.specs.clear();
        Ok(())
    }

    /// Remove a subscriber entirely (transport closed).
    pub fn remove(&self, id: Uuid) {
        if self
            .subscribers
            .write()
            .expect("subscriber lock poisoned")
            .remove(&id)
            .is_some()
        {
            debug!(subscriber = %id, "subscriber removed");
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .len()
    }

    /// Evaluate filters and enqueue `event` for every matching subscriber.
    ///
    /// Subscribers whose queue is full are dropped with a logged reason;
    /// their closed queue ends the transport task, which closes the
    /// connection.
    pub fn fan_out(&self, event: &CatalogEvent) {
        let mut slow: Vec<Uuid> = Vec::new();
        {
            let subscribers = self.subscribers.read().expect("subscriber lock poisoned");
            for (id, handle) in subscribers.iter() {
                if !handle.wants(event) {
                    continue;
                }
                match handle.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            subscriber = %id,
                            username = %handle.username,
                            reason = "outbound queue full",
                            "dropping slow subscriber"
                        );
                        slow.push(*id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Transport already went away; reap below.
                        slow.push(*id);
                    }
                }
            }
        }
        if !slow.is_empty() {
            let mut subscribers = self.subscribers.write().expect("subscriber lock poisoned");
            for id in slow {
                subscribers.remove(&id);
            }
        }
    }

    /// Pump events from the bus into the fan-out until the bus closes.
    ///
    /// Spawn this once per process; delivery to each subscriber is FIFO in
    /// bus-enqueue order.
    pub async fn run(self: Arc<Self>, bus: Arc<EventBus>) {
        let mut subscription = bus.subscribe();
        info!("subscription fan-out started");
        while let Some(event) = subscription.recv().await {
            self.fan_out(&event);
        }
        info!("subscription fan-out stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
