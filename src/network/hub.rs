//! Broadcast Hub
//!
//! Fan-out of round events to every subscriber. Each subscriber owns an
//! independent bounded queue and delivery uses `try_send` only, so a slow or
//! dead consumer is dropped instead of backpressuring the round timer.
//!
//! New subscribers immediately receive a `STATE` snapshot so late joiners
//! see consistent state without waiting for the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::game::events::RoundEvent;
use crate::game::round::{Phase, RoundSnapshot};

/// Queue depth per subscriber. A consumer this far behind a 100ms tick
/// stream is not coming back.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

/// One subscriber's end of the hub.
pub struct Subscription {
    /// Handle for [`BroadcastHub::unsubscribe`].
    pub id: Uuid,
    /// Event stream; closed when the hub drops this subscriber.
    pub events: mpsc::Receiver<RoundEvent>,
}

impl Subscription {
    /// Receive the next event, or `None` once dropped/disconnected.
    pub async fn recv(&mut self) -> Option<RoundEvent> {
        self.events.recv().await
    }
}

struct HubInner {
    subscribers: BTreeMap<Uuid, mpsc::Sender<RoundEvent>>,
    snapshot: RoundSnapshot,
}

/// Shared fan-out hub between the engine and its spectators.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<RwLock<HubInner>>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    /// Create an empty hub with a pre-first-round snapshot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HubInner {
                subscribers: BTreeMap::new(),
                snapshot: RoundSnapshot {
                    phase: Phase::Waiting,
                    multiplier: 1.0,
                    round_id: 0,
                    crash_at: None,
                },
            })),
        }
    }

    /// Register a new subscriber.
    ///
    /// The returned stream is seeded with a `STATE` event for the latest
    /// snapshot before any live event arrives.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = Uuid::new_v4();

        let mut inner = self.inner.write().await;
        // Freshly created queue; the snapshot always fits.
        let _ = tx.try_send(RoundEvent::state(&inner.snapshot));
        inner.subscribers.insert(id, tx);
        debug!(subscriber = %id, total = inner.subscribers.len(), "subscribed");

        Subscription { id, events: rx }
    }

    /// Remove a subscriber explicitly.
    pub async fn unsubscribe(&self, id: Uuid) {
        let mut inner = self.inner.write().await;
        if inner.subscribers.remove(&id).is_some() {
            debug!(subscriber = %id, total = inner.subscribers.len(), "unsubscribed");
        }
    }

    /// Publish an event to every subscriber and refresh the snapshot.
    ///
    /// Never blocks on a subscriber: a full or closed queue gets the
    /// subscriber dropped on the spot.
    pub async fn publish(&self, snapshot: RoundSnapshot, event: RoundEvent) {
        let mut inner = self.inner.write().await;
        inner.snapshot = snapshot;

        let mut dead: Vec<Uuid> = Vec::new();
        for (id, tx) in &inner.subscribers {
            if tx.try_send(event).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            inner.subscribers.remove(&id);
            debug!(subscriber = %id, "dropped slow or disconnected subscriber");
        }
    }

    /// Number of live subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.inner.read().await.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(round_id: u64, multiplier: f64) -> RoundSnapshot {
        RoundSnapshot {
            phase: Phase::Running,
            multiplier,
            round_id,
            crash_at: None,
        }
    }

    #[tokio::test]
    async fn test_subscriber_gets_snapshot_first() {
        let hub = BroadcastHub::new();
        hub.publish(snap(5, 1.42), RoundEvent::tick(142)).await;

        let mut sub = hub.subscribe().await;
        assert_eq!(
            sub.recv().await,
            Some(RoundEvent::State {
                phase: Phase::Running,
                multiplier: 1.42,
                round_id: 5,
            })
        );

        hub.publish(snap(5, 1.43), RoundEvent::tick(143)).await;
        assert_eq!(sub.recv().await, Some(RoundEvent::tick(143)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_dropped() {
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe().await;
        assert_eq!(hub.subscriber_count().await, 1);

        // Snapshot already occupies one slot; fill the rest and overflow.
        for i in 0..SUBSCRIBER_QUEUE_DEPTH as u64 {
            hub.publish(snap(1, 1.0), RoundEvent::tick(100 + i)).await;
        }
        assert_eq!(hub.subscriber_count().await, 0);

        // The stream still drains what was queued, then ends.
        let mut received = 0;
        while sub.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_pruned() {
        let hub = BroadcastHub::new();
        let sub = hub.subscribe().await;
        drop(sub);

        hub.publish(snap(1, 1.0), RoundEvent::tick(100)).await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = BroadcastHub::new();
        let sub = hub.subscribe().await;
        let other = hub.subscribe().await;
        hub.unsubscribe(sub.id).await;
        assert_eq!(hub.subscriber_count().await, 1);

        hub.publish(snap(1, 1.0), RoundEvent::tick(100)).await;
        assert_eq!(hub.subscriber_count().await, 1);
        drop(other);
    }
}
