//! # Scripted transport link for hardware-free testing.
//!
//! [`MockLink`] stands in for the real vehicle-control bridge: tests inject
//! frames per message name, inspect the rate commands the arbiter issued, and
//! flip failure switches to exercise the degraded paths.
//!
//! Enabled in unit tests and behind the `mock` feature for downstream
//! integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

use super::link::{Frame, TransportLink};

#[derive(Default)]
struct MockLinkInner {
    /// Every `set_rate` call, in order.
    rate_calls: Vec<(String, f64)>,
    /// Senders for every subscription ever opened, newest last. Closed
    /// senders are kept so tests can aim frames at dead subscriptions.
    senders: HashMap<String, Vec<mpsc::Sender<Frame>>>,
}

/// Scripted in-memory transport link.
///
/// Cheap to clone; all clones share the same script state.
#[derive(Clone, Default)]
pub struct MockLink {
    inner: Arc<Mutex<MockLinkInner>>,
    fail_rate_commands: Arc<AtomicBool>,
    fail_subscribe: Arc<AtomicBool>,
}

impl MockLink {
    /// Creates a new mock link with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `set_rate` calls fail (or succeed again).
    pub fn fail_rate_commands(&self, fail: bool) {
        self.fail_rate_commands.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `subscribe` calls fail (or succeed again).
    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Returns every rate command issued so far, in call order.
    pub fn rate_calls(&self) -> Vec<(String, f64)> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).rate_calls.clone()
    }

    /// Number of subscriptions ever opened for `message` (live or dead).
    pub fn subscription_count(&self, message: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.senders.get(message).map_or(0, Vec::len)
    }

    /// Delivers a frame to every subscription for `message`.
    ///
    /// Closed subscriptions (cancelled listeners) swallow the frame, exactly
    /// like an in-flight message arriving after unsubscribe. Returns how many
    /// live subscriptions accepted it.
    pub async fn push(&self, message: &str, payload: Value) -> usize {
        let senders: Vec<mpsc::Sender<Frame>> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.senders.get(message).cloned().unwrap_or_default()
        };

        let mut delivered = 0;
        for tx in senders {
            let frame = Frame::now(message, payload.clone());
            if tx.send(frame).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Delivers a frame to one specific subscription, by open order.
    ///
    /// Returns `false` if that subscription no longer accepts frames —
    /// the in-flight-after-cancel case.
    pub async fn push_to(&self, message: &str, subscription: usize, payload: Value) -> bool {
        let sender = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner
                .senders
                .get(message)
                .and_then(|senders| senders.get(subscription))
                .cloned()
        };
        match sender {
            Some(tx) => tx.send(Frame::now(message, payload)).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl TransportLink for MockLink {
    async fn set_rate(&self, message: &str, hz: f64) -> Result<(), TransportError> {
        if self.fail_rate_commands.load(Ordering::SeqCst) {
            return Err(TransportError::RateCommand {
                message: message.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.rate_calls.push((message.to_string(), hz));
        Ok(())
    }

    async fn subscribe(
        &self,
        message: &str,
        frame_buffer: usize,
    ) -> Result<mpsc::Receiver<Frame>, TransportError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(TransportError::Subscribe {
                message: message.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(frame_buffer.max(1));
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.senders.entry(message.to_string()).or_default().push(tx);
        Ok(rx)
    }
}
