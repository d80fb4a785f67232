//! Broadcast Hub
//!
//! Topic-based fan-out to subscribers. Publishing delivers to every current
//! subscriber of a topic; a subscriber whose channel is closed or full is
//! logged and removed, never allowed to fail the publisher or stall other
//! deliveries. Each topic retains its last event, and a new subscriber
//! receives one synthetic snapshot event before any live event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::domain::alert::Alert;
use crate::domain::scoring::CompositeScore;
use crate::domain::token::MarketSnapshot;

/// Default per-subscriber channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TokenUpdates,
    Alerts,
    Analytics,
}

/// Token refresh payload broadcast on [`Topic::TokenUpdates`].
#[derive(Debug, Clone, Serialize)]
pub struct TokenUpdate {
    pub snapshot: MarketSnapshot,
    pub score: Option<CompositeScore>,
    /// True when every provider failed this cycle and the snapshot is the
    /// last known good one
    pub stale: bool,
}

/// Significant-movement payload broadcast on [`Topic::Analytics`].
#[derive(Debug, Clone, Serialize)]
pub struct MovementDelta {
    pub address: String,
    pub price_change_pct: f64,
    pub volume_change_pct: f64,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Synthetic event delivered once to each new subscriber, carrying the
    /// topic's last event if one exists
    Snapshot(Option<Box<Event>>),
    TokenUpdate(TokenUpdate),
    Alert(Alert),
    Movement(MovementDelta),
}

/// A subscription to one topic. Dropping the handle (or its receiver) ends
/// the subscription on the next publish.
pub struct SubscriberHandle {
    pub id: u64,
    pub topic: Topic,
    pub events: mpsc::Receiver<Event>,
}

struct TopicState {
    subscribers: Vec<(u64, mpsc::Sender<Event>)>,
    retained: Option<Event>,
}

impl TopicState {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            retained: None,
        }
    }
}

pub struct BroadcastHub {
    topics: RwLock<HashMap<Topic, TopicState>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Subscribe to a topic. The returned handle's receiver immediately
    /// holds one synthetic snapshot event.
    pub async fn subscribe(&self, topic: Topic) -> SubscriberHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut topics = self.topics.write().await;
        let state = topics.entry(topic).or_insert_with(TopicState::new);

        let snapshot = Event::Snapshot(state.retained.clone().map(Box::new));
        // Capacity is at least 1 and the channel is brand new
        let _ = tx.try_send(snapshot);

        state.subscribers.push((id, tx));
        debug!(?topic, id, "Subscriber added");

        SubscriberHandle {
            id,
            topic,
            events: rx,
        }
    }

    /// Deliver an event to every subscriber of the topic. Returns how many
    /// deliveries succeeded; failed handles are removed.
    pub async fn publish(&self, topic: Topic, event: Event) -> usize {
        let mut topics = self.topics.write().await;
        let state = topics.entry(topic).or_insert_with(TopicState::new);
        state.retained = Some(event.clone());

        let mut delivered = 0;
        state.subscribers.retain(|(id, tx)| {
            match tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(?topic, id, error = %e, "Dropping subscriber after failed delivery");
                    false
                }
            }
        });

        delivered
    }

    pub async fn unsubscribe(&self, handle: &SubscriberHandle) {
        let mut topics = self.topics.write().await;
        if let Some(state) = topics.get_mut(&handle.topic) {
            state.subscribers.retain(|(id, _)| *id != handle.id);
        }
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics
            .read()
            .await
            .get(&topic)
            .map(|s| s.subscribers.len())
            .unwrap_or(0)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertKind, AlertPriority};

    fn alert_event() -> Event {
        Event::Alert(Alert::new(
            "addr",
            AlertKind::Price,
            AlertPriority::High,
            "spike",
        ))
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe(Topic::Alerts).await;

        // First event is the synthetic snapshot (empty topic → no retained)
        match sub.events.recv().await.unwrap() {
            Event::Snapshot(None) => {}
            other => panic!("expected empty snapshot, got {other:?}"),
        }

        let delivered = hub.publish(Topic::Alerts, alert_event()).await;
        assert_eq!(delivered, 1);
        assert!(matches!(sub.events.recv().await.unwrap(), Event::Alert(_)));
    }

    #[tokio::test]
    async fn test_new_subscriber_gets_retained_snapshot() {
        let hub = BroadcastHub::new();
        hub.publish(Topic::Alerts, alert_event()).await;

        let mut sub = hub.subscribe(Topic::Alerts).await;
        match sub.events.recv().await.unwrap() {
            Event::Snapshot(Some(inner)) => assert!(matches!(*inner, Event::Alert(_))),
            other => panic!("expected retained snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_removed_others_unaffected() {
        let hub = BroadcastHub::new();
        let dead = hub.subscribe(Topic::TokenUpdates).await;
        let mut alive = hub.subscribe(Topic::TokenUpdates).await;
        drop(dead); // receiver gone

        let delivered = hub
            .publish(
                Topic::TokenUpdates,
                Event::Movement(MovementDelta {
                    address: "addr".into(),
                    price_change_pct: 7.0,
                    volume_change_pct: 30.0,
                }),
            )
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(hub.subscriber_count(Topic::TokenUpdates).await, 1);

        // Drain the synthetic snapshot, then the live event arrives
        alive.events.recv().await.unwrap();
        assert!(matches!(
            alive.events.recv().await.unwrap(),
            Event::Movement(_)
        ));
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let hub = BroadcastHub::new();
        let mut alerts_sub = hub.subscribe(Topic::Alerts).await;
        let _updates_sub = hub.subscribe(Topic::TokenUpdates).await;

        hub.publish(Topic::TokenUpdates, alert_event()).await;

        alerts_sub.events.recv().await.unwrap(); // synthetic snapshot
        assert!(alerts_sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = BroadcastHub::new();
        let sub = hub.subscribe(Topic::Analytics).await;
        assert_eq!(hub.subscriber_count(Topic::Analytics).await, 1);

        hub.unsubscribe(&sub).await;
        assert_eq!(hub.subscriber_count(Topic::Analytics).await, 0);
    }
}
