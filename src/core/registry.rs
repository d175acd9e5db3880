//! # Listener registry - per-name subscription bookkeeping.
//!
//! The registry holds the single active [`Listener`] per message name and the
//! per-name [`ConsumerSet`]s that survive listener replacement.
//!
//! ## Rules
//! - At most one active listener per message name; the swap in
//!   [`install`](ListenerRegistry::install) happens under the write lock and
//!   cancels the outgoing listener before the lock is released, so two
//!   listeners for one name are never live at once.
//! - `install` re-validates the current frequency: a request that raced a
//!   faster install loses, and its freshly built listener is cancelled before
//!   it ever forwards a frame.
//! - Consumer sets are created on demand and never removed; a listener
//!   replacement or removal does not disconnect consumers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use crate::consumers::ConsumerSet;
use crate::events::{Bus, Event, EventKind};

use super::listener::Listener;

/// Outcome of an install attempt, before arbitration maps it to a
/// caller-facing decision.
pub(crate) enum InstallOutcome {
    /// No listener existed; the new one is in place.
    Installed,
    /// A slower listener was cancelled and replaced.
    Replaced { previous_hz: f64 },
    /// A concurrent caller installed a faster/equal listener first; the
    /// candidate was cancelled.
    Lost { active_hz: f64 },
}

/// Per-name listener bookkeeping shared by the arbiter.
pub(crate) struct ListenerRegistry {
    listeners: RwLock<HashMap<Arc<str>, Listener>>,
    consumers: Mutex<HashMap<Arc<str>, Arc<ConsumerSet>>>,
    bus: Bus,
    default_queue_capacity: usize,
}

impl ListenerRegistry {
    pub(crate) fn new(bus: Bus, default_queue_capacity: usize) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            consumers: Mutex::new(HashMap::new()),
            bus,
            default_queue_capacity,
        }
    }

    /// Frequency of the active listener for `message`, if one exists.
    pub(crate) async fn current_frequency(&self, message: &str) -> Option<f64> {
        let listeners = self.listeners.read().await;
        listeners
            .get(message)
            .filter(|l| l.is_active())
            .map(Listener::frequency_hz)
    }

    /// Installs `listener`, replacing (and cancelling) any slower one.
    ///
    /// The frequency check and the swap happen under one write lock; the
    /// outgoing listener is cancelled before the lock is released.
    pub(crate) async fn install(&self, listener: Listener) -> InstallOutcome {
        let message = listener.message_arc();
        let rate_hz = listener.frequency_hz();

        let previous = {
            let mut listeners = self.listeners.write().await;
            if let Some(existing) = listeners.get(&*message) {
                if existing.is_active() && existing.frequency_hz() >= rate_hz {
                    let active_hz = existing.frequency_hz();
                    drop(listeners);
                    listener.cancel();
                    listener.join().await;
                    return InstallOutcome::Lost { active_hz };
                }
            }
            let previous = listeners.insert(Arc::clone(&message), listener);
            if let Some(prev) = &previous {
                prev.cancel();
            }
            previous
        };

        match previous {
            Some(prev) => {
                let previous_hz = prev.frequency_hz();
                self.bus.publish(
                    Event::new(EventKind::ListenerReplaced)
                        .with_message(Arc::clone(&message))
                        .with_rate(rate_hz)
                        .with_active_rate(previous_hz),
                );
                prev.join().await;
                InstallOutcome::Replaced { previous_hz }
            }
            None => {
                self.bus.publish(
                    Event::new(EventKind::ListenerInstalled)
                        .with_message(Arc::clone(&message))
                        .with_rate(rate_hz),
                );
                InstallOutcome::Installed
            }
        }
    }

    /// Cancels and clears the listener for `message`.
    ///
    /// Returns `false` if no listener was registered. Consumers stay attached;
    /// a later request re-feeds them.
    pub(crate) async fn remove(&self, message: &str) -> bool {
        let removed = self.listeners.write().await.remove(message);
        match removed {
            Some(listener) => {
                let rate_hz = listener.frequency_hz();
                let name = listener.message_arc();
                listener.cancel();
                listener.join().await;
                self.bus.publish(
                    Event::new(EventKind::ListenerRemoved)
                        .with_message(name)
                        .with_rate(rate_hz),
                );
                true
            }
            None => false,
        }
    }

    /// Returns (creating on demand) the consumer fan-out set for `message`.
    pub(crate) fn consumers(&self, message: &str) -> Arc<ConsumerSet> {
        let mut sets = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = sets.get(message) {
            return Arc::clone(set);
        }
        let name: Arc<str> = Arc::from(message);
        let set = Arc::new(ConsumerSet::new(
            Arc::clone(&name),
            self.default_queue_capacity,
            self.bus.clone(),
        ));
        sets.insert(name, Arc::clone(&set));
        set
    }

    /// Snapshot of all consumer sets (for shutdown draining).
    pub(crate) fn consumer_sets(&self) -> Vec<Arc<ConsumerSet>> {
        let sets = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        sets.values().cloned().collect()
    }

    /// Returns the sorted list of message names with an active listener.
    pub(crate) async fn list(&self) -> Vec<String> {
        let listeners = self.listeners.read().await;
        let mut names: Vec<String> = listeners
            .iter()
            .filter(|(_, l)| l.is_active())
            .map(|(name, _)| name.to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// True if no listener is registered.
    pub(crate) async fn is_empty(&self) -> bool {
        self.listeners.read().await.is_empty()
    }

    /// Cancels and drains every listener, returning them for joining.
    pub(crate) async fn drain_all(&self) -> Vec<(String, Listener)> {
        let drained: Vec<(Arc<str>, Listener)> = {
            let mut listeners = self.listeners.write().await;
            listeners.drain().collect()
        };

        for (_, listener) in &drained {
            listener.cancel();
        }

        drained
            .into_iter()
            .map(|(name, listener)| (name.to_string(), listener))
            .collect()
    }
}
