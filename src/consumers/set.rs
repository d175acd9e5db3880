//! # ConsumerSet: non-blocking fan-out over one message name's consumers
//!
//! [`ConsumerSet`] distributes each [`StoredMessage`] to every attached
//! consumer **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&StoredMessage)` returns immediately.
//! - Per-consumer FIFO (queue order).
//! - Panics inside consumers are caught and published (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different consumers.
//! - No retries on per-consumer queue overflow (that update is dropped for
//!   the consumer; the store still holds it).
//!
//! ## Membership
//! Unlike a fixed pipeline, consumers come and go per message name as rate
//! requests arrive, so membership is dynamic: [`ConsumerSet::attach`] may be
//! called at any time. A set survives listener replacement — promotion to a
//! faster rate never disconnects anyone.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::store::StoredMessage;

use super::Consume;

/// Per-consumer channel with metadata
struct ConsumerChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<StoredMessage>>,
}

/// Composite fan-out with per-consumer bounded queues and worker tasks.
///
/// One set exists per message name, shared between the registry entry and
/// the listener forwarder feeding it.
pub struct ConsumerSet {
    message: Arc<str>,
    bus: Bus,
    default_capacity: usize,
    channels: Mutex<Vec<ConsumerChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsumerSet {
    /// Creates an empty set for `message`.
    #[must_use]
    pub fn new(message: Arc<str>, default_capacity: usize, bus: Bus) -> Self {
        Self {
            message,
            bus,
            default_capacity: default_capacity.max(1),
            channels: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Attaches a consumer and spawns its worker.
    ///
    /// Publishes [`EventKind::ConsumerAttached`]. The consumer starts
    /// receiving with the next `emit`; it does not observe earlier updates
    /// (read the store for the current value).
    pub fn attach(&self, consumer: Arc<dyn Consume>) {
        let declared = consumer.queue_capacity();
        let cap = if declared == 0 { self.default_capacity } else { declared };
        let name = consumer.name();
        let (tx, mut rx) = mpsc::channel::<Arc<StoredMessage>>(cap);

        let bus = self.bus.clone();
        let worker = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let fut = consumer.on_message(update.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    bus.publish(Event::consumer_panicked(name, format!("{panic_err:?}")));
                }
            }
        });

        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ConsumerChannel { name, sender: tx });
        self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(worker);

        self.bus.publish(
            Event::new(EventKind::ConsumerAttached)
                .with_message(Arc::clone(&self.message))
                .with_consumer(name),
        );
    }

    /// Fan-out one update to all consumers (non-blocking).
    ///
    /// If a consumer's queue is **full** or **closed**, the update is dropped
    /// for it and a [`EventKind::ConsumerOverflow`] event is published.
    pub fn emit(&self, update: &StoredMessage) {
        let shared = Arc::new(update.clone());
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        for channel in channels.iter() {
            match channel.sender.try_send(Arc::clone(&shared)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.bus
                        .publish(Event::consumer_overflow(&self.message, channel.name, "full"));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.bus
                        .publish(Event::consumer_overflow(&self.message, channel.name, "closed"));
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(&self) {
        let channels = std::mem::take(&mut *self.channels.lock().unwrap_or_else(|e| e.into_inner()));
        drop(channels);
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in workers {
            let _ = handle.await;
        }
    }

    /// Message name this set delivers for.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True if there are no consumers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    /// Number of attached consumers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MessageStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Consume for Counter {
        async fn on_message(&self, _update: &StoredMessage) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    fn stored(payload: serde_json::Value) -> StoredMessage {
        let store = MessageStore::new();
        store.upsert("ATTITUDE", payload, 2.0, SystemTime::now())
    }

    #[tokio::test]
    async fn test_emit_reaches_every_consumer() {
        let bus = Bus::new(16);
        let set = ConsumerSet::new(Arc::from("ATTITUDE"), 8, bus);

        let a = Arc::new(Counter { seen: AtomicUsize::new(0) });
        let b = Arc::new(Counter { seen: AtomicUsize::new(0) });
        set.attach(a.clone());
        set.attach(b.clone());
        assert_eq!(set.len(), 2);

        set.emit(&stored(json!({"roll": 0.1})));
        set.emit(&stored(json!({"roll": 0.2})));
        set.shutdown().await;

        assert_eq!(a.seen.load(Ordering::SeqCst), 2);
        assert_eq!(b.seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overflow_drops_and_publishes() {
        struct Stuck;

        #[async_trait::async_trait]
        impl Consume for Stuck {
            async fn on_message(&self, _update: &StoredMessage) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }

            fn name(&self) -> &'static str {
                "stuck"
            }

            fn queue_capacity(&self) -> usize {
                1
            }
        }

        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let set = ConsumerSet::new(Arc::from("ATTITUDE"), 8, bus);
        set.attach(Arc::new(Stuck));

        // Let the worker pull the first update and park in on_message.
        set.emit(&stored(json!(1)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Fills the queue, then overflows it.
        set.emit(&stored(json!(2)));
        set.emit(&stored(json!(3)));

        let mut saw_overflow = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ConsumerOverflow {
                assert_eq!(ev.consumer.as_deref(), Some("stuck"));
                assert_eq!(ev.reason.as_deref(), Some("full"));
                saw_overflow = true;
            }
        }
        assert!(saw_overflow, "expected a ConsumerOverflow event");
    }

    #[tokio::test]
    async fn test_consumer_panic_is_isolated() {
        struct Bomb;

        #[async_trait::async_trait]
        impl Consume for Bomb {
            async fn on_message(&self, _update: &StoredMessage) {
                panic!("boom");
            }

            fn name(&self) -> &'static str {
                "bomb"
            }
        }

        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let set = ConsumerSet::new(Arc::from("ATTITUDE"), 8, bus);

        let counter = Arc::new(Counter { seen: AtomicUsize::new(0) });
        set.attach(Arc::new(Bomb));
        set.attach(counter.clone());

        set.emit(&stored(json!(1)));
        set.shutdown().await;

        assert_eq!(counter.seen.load(Ordering::SeqCst), 1, "panic must not affect peers");
        let mut saw_panic = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ConsumerPanicked {
                saw_panic = true;
            }
        }
        assert!(saw_panic, "expected a ConsumerPanicked event");
    }
}
