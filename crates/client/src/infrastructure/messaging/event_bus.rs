//! Event Bus for per-entity notifications.
//!
//! Each entity (client, user, channel, lobby) owns one bus. Subscribers are
//! invoked synchronously with the trigger, in registration order. The
//! subscriber list is snapshotted before delivery, so a callback may subscribe
//! or unsubscribe without deadlocking the bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

enum Subscriber<E> {
    Callback(Callback<E>),
    Channel(mpsc::UnboundedSender<E>),
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Callback(cb) => Subscriber::Callback(Arc::clone(cb)),
            Subscriber::Channel(tx) => Subscriber::Channel(tx.clone()),
        }
    }
}

struct BusInner<E> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<E>)>>,
}

/// Push-based event bus.
///
/// Cloning the bus yields another handle to the same subscriber list.
pub struct EventBus<E> {
    inner: Arc<BusInner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + 'static> EventBus<E> {
    /// Create a new EventBus with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber<E>)>> {
        // Subscribers never panic while the lock is held
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, subscriber: Subscriber<E>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers().push((id, subscriber));
        id
    }

    /// Subscribe to all events.
    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        self.push(Subscriber::Callback(Arc::new(callback)))
    }

    /// Subscribe through a channel. The subscription ends when the receiver is
    /// dropped.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Subscriber::Channel(tx));
        rx
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Deliver an event to every subscriber.
    pub fn publish(&self, event: E) {
        let snapshot: Vec<(SubscriptionId, Subscriber<E>)> = self.subscribers().clone();

        let mut closed = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Callback(cb) => cb(&event),
                Subscriber::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        closed.push(id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            self.subscribers().retain(|(id, _)| !closed.contains(id));
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Clear all subscribers.
    pub fn clear(&self) {
        self.subscribers().clear();
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_subscribe_and_publish() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = Arc::clone(&count);
        bus.subscribe(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(1);
        bus.publish(2);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_registration_order_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(move |_| order.lock().expect("lock").push(tag));
        }
        bus.publish(0);

        assert_eq!(
            *order.lock().expect("lock"),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        let id = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_subscribe_during_publish() {
        let bus: EventBus<u32> = EventBus::new();
        let inner_bus = bus.clone();
        bus.subscribe(move |_| {
            inner_bus.subscribe(|_| {});
        });

        bus.publish(1);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_channel_subscription_is_dropped_with_receiver() {
        let bus: EventBus<u32> = EventBus::new();
        let mut rx = bus.subscribe_channel();

        bus.publish(7);
        assert_eq!(rx.recv().await, Some(7));

        drop(rx);
        bus.publish(8);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
