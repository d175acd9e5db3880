//! # Listener: one active subscription to one message name.
//!
//! A [`Listener`] owns the receiving half of the transport's frame channel
//! and the forwarder task draining it. Each frame is written to the
//! [`MessageStore`] and fanned out to the name's consumers.
//!
//! ## Cancellation gate
//! The forwarder `select!`s (biased) on the cancellation token before the
//! frame channel, and re-checks the token after a frame is pulled. A frame
//! that arrives after `cancel()` is therefore dropped, never written — late
//! in-flight deliveries from the link cannot overwrite a newer value. This is
//! the listener's own discipline; callers may assume every delivered update
//! came from a live subscription.
//!
//! ## Ownership
//! A listener is exclusively owned by its registry entry. When replaced it is
//! cancelled and discarded, never reused. Exiting the forwarder drops the
//! frame receiver, which is the unsubscribe signal to the link.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::consumers::ConsumerSet;
use crate::events::{Bus, Event, EventKind};
use crate::store::MessageStore;
use crate::transport::Frame;

/// One active subscription: message name, delivery frequency, cancellation
/// state and the forwarder task.
pub struct Listener {
    message: Arc<str>,
    /// Requested frequency as `f64` bits, so `set_frequency` stays lock-free.
    frequency_bits: Arc<AtomicU64>,
    token: CancellationToken,
    forwarder: JoinHandle<()>,
}

impl Listener {
    /// Spawns the forwarder task and returns the owning handle.
    ///
    /// `parent` is the runtime token; cancelling it (shutdown) cancels every
    /// listener without the registry having to visit each one.
    pub(crate) fn spawn(
        message: Arc<str>,
        frequency_hz: f64,
        mut rx: mpsc::Receiver<Frame>,
        store: Arc<MessageStore>,
        consumers: Arc<ConsumerSet>,
        bus: Bus,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let frequency_bits = Arc::new(AtomicU64::new(frequency_hz.to_bits()));

        let task_token = token.clone();
        let task_bits = Arc::clone(&frequency_bits);
        let task_message = Arc::clone(&message);
        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    maybe = rx.recv() => match maybe {
                        Some(frame) => {
                            // A frame pulled in the same poll the token flipped
                            // must still be gated.
                            if task_token.is_cancelled() {
                                bus.publish(
                                    Event::new(EventKind::StaleFrameDropped)
                                        .with_message(Arc::clone(&task_message)),
                                );
                                break;
                            }
                            let hz = f64::from_bits(task_bits.load(Ordering::Relaxed));
                            let stored =
                                store.upsert(&task_message, frame.payload, hz, frame.at);
                            consumers.emit(&stored);
                        }
                        // Link closed this subscription from its side.
                        None => break,
                    }
                }
            }
            // Mark the listener inactive on every exit path, including a
            // link-side close, so the registry never coalesces onto a dead
            // subscription. Child tokens do not propagate upward.
            task_token.cancel();
            // rx drops here: the link sees the subscription end.
        });

        Self {
            message,
            frequency_bits,
            token,
            forwarder,
        }
    }

    /// Message name this listener is subscribed to.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn message_arc(&self) -> Arc<str> {
        Arc::clone(&self.message)
    }

    /// Current requested delivery frequency in Hz.
    pub fn frequency_hz(&self) -> f64 {
        f64::from_bits(self.frequency_bits.load(Ordering::Relaxed))
    }

    /// Updates the local frequency bookkeeping.
    ///
    /// Does not touch the transport: rate commands are the arbiter's job and
    /// are re-issued (idempotently) on every request.
    pub fn set_frequency(&self, hz: f64) {
        self.frequency_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    /// True until [`cancel`](Listener::cancel) is called (or shutdown cancels
    /// the runtime token).
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancels the subscription. Idempotent.
    ///
    /// After this returns, the listener will never write the store or invoke
    /// a consumer again; an already-in-flight frame is dropped by the gate.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Awaits the forwarder task after cancellation.
    pub(crate) async fn join(self) {
        let _ = self.forwarder.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn harness() -> (Arc<MessageStore>, Arc<ConsumerSet>, Bus) {
        let bus = Bus::new(16);
        let store = Arc::new(MessageStore::new());
        let consumers = Arc::new(ConsumerSet::new(Arc::from("ATTITUDE"), 8, bus.clone()));
        (store, consumers, bus)
    }

    #[tokio::test]
    async fn test_forwarder_writes_store() {
        let (store, consumers, bus) = harness();
        let (tx, rx) = mpsc::channel(8);
        let parent = CancellationToken::new();
        let listener = Listener::spawn(
            Arc::from("ATTITUDE"),
            2.0,
            rx,
            Arc::clone(&store),
            consumers,
            bus,
            &parent,
        );

        tx.send(Frame::now("ATTITUDE", json!({"roll": 0.1})))
            .await
            .expect("forwarder alive");
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let got = store.get("ATTITUDE").expect("value stored");
        assert_eq!(got.payload, json!({"roll": 0.1}));
        assert_eq!(got.requested_rate_hz, 2.0);
        assert!(listener.is_active());
    }

    #[tokio::test]
    async fn test_cancelled_listener_never_writes() {
        let (store, consumers, bus) = harness();
        let (tx, rx) = mpsc::channel(8);
        let parent = CancellationToken::new();
        let listener = Listener::spawn(
            Arc::from("ATTITUDE"),
            2.0,
            rx,
            Arc::clone(&store),
            consumers,
            bus,
            &parent,
        );

        listener.cancel();
        listener.cancel(); // idempotent
        assert!(!listener.is_active());

        // In-flight frame delivered after cancellation.
        let _ = tx.send(Frame::now("ATTITUDE", json!({"roll": 9.9}))).await;
        listener.join().await;

        assert!(store.get("ATTITUDE").is_none(), "stale frame must be dropped");
    }

    #[tokio::test]
    async fn test_parent_token_cancels_listener() {
        let (store, consumers, bus) = harness();
        let (_tx, rx) = mpsc::channel(8);
        let parent = CancellationToken::new();
        let listener = Listener::spawn(
            Arc::from("ATTITUDE"),
            2.0,
            rx,
            store,
            consumers,
            bus,
            &parent,
        );

        parent.cancel();
        assert!(!listener.is_active());
        listener.join().await;
    }

    #[tokio::test]
    async fn test_set_frequency_is_local_bookkeeping() {
        let (store, consumers, bus) = harness();
        let (tx, rx) = mpsc::channel(8);
        let parent = CancellationToken::new();
        let listener = Listener::spawn(
            Arc::from("ATTITUDE"),
            2.0,
            rx,
            Arc::clone(&store),
            consumers,
            bus,
            &parent,
        );

        listener.set_frequency(10.0);
        assert_eq!(listener.frequency_hz(), 10.0);

        tx.send(Frame::now("ATTITUDE", json!(1))).await.expect("alive");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(
            store.get("ATTITUDE").expect("stored").requested_rate_hz,
            10.0,
            "subsequent writes carry the updated rate"
        );
    }
}
