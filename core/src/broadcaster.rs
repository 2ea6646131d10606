//! Change-event fan-out to live subscribers.
//!
//! The store publishes every committed mutation into a single internal
//! channel. A dedicated dispatch task drains that channel and copies the
//! serialized event onto one bounded outbound queue per subscriber, in
//! subscriber-registration order.
//!
//! # Architecture
//!
//! ```text
//! Store            Broadcaster             Subscribers
//!   │                   │                       │
//!   ├─ publish(event) ─>│  (unbounded queue)    │
//!   │                   ├─ serialize once       │
//!   │                   ├─ try_send ───────────>│ queue A
//!   │                   ├─ try_send ───────────>│ queue B (full → evict)
//!   │                   │                       │
//! ```
//!
//! Publishing never blocks the store: the internal channel is unbounded
//! and fan-out happens on the dispatch task. A subscriber whose queue is
//! full when an event arrives is evicted (its queue is dropped, which
//! closes the connection) so that one slow consumer never stalls delivery
//! to the others.
//!
//! There is no replay: a subscriber only observes events published after
//! it registered. Events already published may still be sitting in the
//! internal channel when a subscriber registers, so registration records
//! the highest published sequence number as a threshold and the dispatch
//! task skips any event at or below it for that subscriber.

use crate::types::ChangeEvent;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, warn};

/// Default capacity of each subscriber's outbound queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Identifier of a live subscriber, unique for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half handed to the store for event publication.
///
/// Cheap to clone; sending is a non-blocking queue push, so it is safe to
/// call while holding the store's write lock without serializing mutation
/// latency against subscriber fan-out.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    last_published: Arc<AtomicU64>,
}

impl EventSink {
    /// Wraps a raw sender.
    ///
    /// Normally obtained via [`Broadcaster::publisher`]; constructing one
    /// from a bare channel is useful for capturing events in tests.
    #[must_use]
    pub fn from_sender(tx: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        Self {
            tx,
            last_published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes a committed change event.
    ///
    /// The sequence watermark is advanced before the event enters the
    /// channel, so a subscriber registering afterwards can never be handed
    /// this event out of the channel backlog.
    ///
    /// A send failure means the dispatch task has shut down; the event is
    /// dropped, which only happens during process teardown.
    pub fn publish(&self, event: ChangeEvent) {
        self.last_published.fetch_max(event.sequence, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            debug!("Dispatch task gone, dropping change event");
        }
    }
}

/// One registered subscriber: its bounded queue plus bookkeeping.
struct SubscriberEntry {
    id: SubscriberId,
    queue: mpsc::Sender<String>,
    connected_at: DateTime<Utc>,
    /// Highest sequence already published when this subscriber joined;
    /// events at or below it are pre-connection history and are skipped.
    joined_seq: u64,
}

/// A live subscription: the receiving half of one subscriber's queue.
///
/// Dropping the subscription (or calling [`Broadcaster::unsubscribe`])
/// ends the stream; the dispatch task prunes the dead entry on the next
/// delivery attempt.
pub struct Subscription {
    /// Identifier to pass back to [`Broadcaster::unsubscribe`].
    pub id: SubscriberId,
    /// Serialized change events, in publication order.
    pub events: mpsc::Receiver<String>,
}

/// Fans committed change events out to all live subscribers.
pub struct Broadcaster {
    subscribers: Arc<Mutex<Vec<SubscriberEntry>>>,
    event_tx: mpsc::UnboundedSender<ChangeEvent>,
    last_published: Arc<AtomicU64>,
    queue_capacity: usize,
    next_id: AtomicU64,
}

impl Broadcaster {
    /// Creates a broadcaster and spawns its dispatch task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let subscribers = Arc::new(Mutex::new(Vec::new()));

        tokio::spawn(dispatch(event_rx, Arc::clone(&subscribers)));

        Self {
            subscribers,
            event_tx,
            last_published: Arc::new(AtomicU64::new(0)),
            queue_capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the sending half the store publishes into.
    #[must_use]
    pub fn publisher(&self) -> EventSink {
        EventSink {
            tx: self.event_tx.clone(),
            last_published: Arc::clone(&self.last_published),
        }
    }

    /// Registers a new subscriber and returns its subscription.
    ///
    /// The subscriber will observe every event published after this call
    /// returns, and none published before it — including events that are
    /// still queued in the internal channel at registration time, which
    /// the recorded sequence watermark filters out.
    pub async fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (queue, events) = mpsc::channel(self.queue_capacity);

        let entry = SubscriberEntry {
            id,
            queue,
            connected_at: Utc::now(),
            joined_seq: self.last_published.load(Ordering::SeqCst),
        };

        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(entry);
        debug!(subscriber = %id, total = subscribers.len(), "Subscriber registered");

        Subscription { id, events }
    }

    /// Deregisters a subscriber and drops its queue in one step.
    ///
    /// Safe to call for an id that was already evicted.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|entry| entry.id != id);
        if subscribers.len() < before {
            debug!(subscriber = %id, total = subscribers.len(), "Subscriber deregistered");
        }
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Connection timestamp of a registered subscriber, if still live.
    pub async fn connected_at(&self, id: SubscriberId) -> Option<DateTime<Utc>> {
        self.subscribers
            .lock()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.connected_at)
    }
}

/// Drains the internal event channel and fans out to subscriber queues.
///
/// Runs until every [`EventSink`] clone is dropped. Each event is
/// serialized once and walked across subscribers in registration order;
/// eviction of one subscriber never disturbs delivery to the others.
async fn dispatch(
    mut event_rx: mpsc::UnboundedReceiver<ChangeEvent>,
    subscribers: Arc<Mutex<Vec<SubscriberEntry>>>,
) {
    while let Some(event) = event_rx.recv().await {
        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, sequence = event.sequence, "Failed to serialize change event");
                continue;
            }
        };

        let mut subscribers = subscribers.lock().await;
        subscribers.retain(|entry| {
            // Pre-connection history for this subscriber: no replay.
            if event.sequence <= entry.joined_seq {
                return true;
            }
            match entry.queue.try_send(payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        subscriber = %entry.id,
                        sequence = event.sequence,
                        "Outbound queue full, evicting slow subscriber"
                    );
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = %entry.id, "Subscriber gone, pruning");
                    false
                }
            }
        });
    }

    debug!("Event channel closed, dispatch task terminating");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use crate::types::{ChangeKind, Todo, TodoId};
    use std::time::Duration;

    fn event(sequence: u64) -> ChangeEvent {
        ChangeEvent {
            sequence,
            kind: ChangeKind::Created,
            todo: Todo::new(TodoId(sequence), format!("task {sequence}"), false),
        }
    }

    /// Polls until `count` subscribers remain, or panics after ~2s.
    async fn wait_for_count(broadcaster: &Broadcaster, count: usize) {
        for _ in 0..200 {
            if broadcaster.subscriber_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "subscriber count never reached {count}, still {}",
            broadcaster.subscriber_count().await
        );
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers_in_order() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let sink = broadcaster.publisher();

        let mut a = broadcaster.subscribe().await;
        let mut b = broadcaster.subscribe().await;

        sink.publish(event(1));
        sink.publish(event(2));

        for subscription in [&mut a, &mut b] {
            let first = subscription.events.recv().await.unwrap();
            let second = subscription.events.recv().await.unwrap();
            assert!(first.contains(r#""sequence":1"#));
            assert!(second.contains(r#""sequence":2"#));
        }
    }

    #[tokio::test]
    async fn payload_is_serialized_change_event() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let sink = broadcaster.publisher();
        let mut subscription = broadcaster.subscribe().await;

        sink.publish(ChangeEvent {
            sequence: 9,
            kind: ChangeKind::Updated,
            todo: Todo::new(TodoId(7), "gym".to_string(), false),
        });

        let payload = subscription.events.recv().await.unwrap();
        let parsed: ChangeEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.sequence, 9);
        assert_eq!(parsed.kind, ChangeKind::Updated);
        assert_eq!(parsed.todo.id, TodoId(7));
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_history() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let sink = broadcaster.publisher();

        let mut early = broadcaster.subscribe().await;
        sink.publish(event(1));
        sink.publish(event(2));

        // Make sure both events were dispatched before the late join.
        early.events.recv().await.unwrap();
        early.events.recv().await.unwrap();

        let mut late = broadcaster.subscribe().await;
        sink.publish(event(3));

        let only = late.events.recv().await.unwrap();
        assert!(only.contains(r#""sequence":3"#));
    }

    #[tokio::test]
    async fn registration_behind_a_lagging_dispatch_gets_no_replay() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let sink = broadcaster.publisher();

        // No await between publish and subscribe: both events are still
        // sitting undispatched in the internal channel when the new
        // subscriber registers. Its watermark must filter them out.
        sink.publish(event(1));
        sink.publish(event(2));

        let mut late = broadcaster.subscribe().await;
        sink.publish(event(3));

        let first = late.events.recv().await.unwrap();
        let first: ChangeEvent = serde_json::from_str(&first).unwrap();
        assert_eq!(first.sequence, 3);
    }

    #[tokio::test]
    async fn slow_subscriber_is_evicted_without_disturbing_others() {
        let broadcaster = Broadcaster::new(2);
        let sink = broadcaster.publisher();

        let mut fast = broadcaster.subscribe().await;
        let slow = broadcaster.subscribe().await;

        // Three events overflow the slow subscriber's 2-slot queue.
        sink.publish(event(1));
        sink.publish(event(2));
        sink.publish(event(3));

        for expected in 1..=3u64 {
            let payload = fast.events.recv().await.unwrap();
            assert!(payload.contains(&format!(r#""sequence":{expected}"#)));
        }

        wait_for_count(&broadcaster, 1).await;

        // Eviction dropped the queue's sending half; the stream ends after
        // the two buffered events.
        let mut slow = slow;
        assert!(slow.events.recv().await.is_some());
        assert!(slow.events.recv().await.is_some());
        assert!(slow.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned_on_next_delivery() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let sink = broadcaster.publisher();

        let subscription = broadcaster.subscribe().await;
        drop(subscription);
        assert_eq!(broadcaster.subscriber_count().await, 1);

        sink.publish(event(1));
        wait_for_count(&broadcaster, 0).await;
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let broadcaster = Broadcaster::new(DEFAULT_QUEUE_CAPACITY);
        let subscription = broadcaster.subscribe().await;
        assert!(broadcaster.connected_at(subscription.id).await.is_some());

        broadcaster.unsubscribe(subscription.id).await;
        broadcaster.unsubscribe(subscription.id).await;

        assert_eq!(broadcaster.subscriber_count().await, 0);
        assert!(broadcaster.connected_at(subscription.id).await.is_none());
    }
}
