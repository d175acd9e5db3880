//! # Arbitration events emitted by the arbiter, registry and listeners.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Request events**: rate-request flow (requested, rejected, coalesced)
//! - **Listener events**: subscription lifecycle (installed, replaced, removed)
//! - **Delivery events**: frame/consumer plumbing (stale drop, attach, overflow)
//! - **Lifecycle events**: shutdown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! message names, rates and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order.
//!
//! ## Example
//! ```rust
//! use msgvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RequestCoalesced)
//!     .with_message("ATTITUDE")
//!     .with_rate(2.0)
//!     .with_active_rate(10.0);
//!
//! assert_eq!(ev.kind, EventKind::RequestCoalesced);
//! assert_eq!(ev.message.as_deref(), Some("ATTITUDE"));
//! assert_eq!(ev.active_hz, Some(10.0));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of arbitration events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Request events ===
    /// A consumer asked for a message at a desired rate.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: requested rate
    RateRequested,

    /// A request was rejected before touching registry or transport.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: rejected rate
    /// - `reason`: rejection label (e.g. "invalid_rate")
    RequestRejected,

    /// An active listener already satisfies the requested rate; no new
    /// subscription was created.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: requested rate
    /// - `active_hz`: rate of the listener that stays in place
    RequestCoalesced,

    /// The best-effort rate command to the transport link failed.
    ///
    /// Non-fatal: local bookkeeping proceeds, the link is expected to recover.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: rate the command asked for
    /// - `reason`: link failure description
    RateCommandFailed,

    // === Listener lifecycle events ===
    /// A new listener was installed for a previously unsubscribed message.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: listener frequency
    ListenerInstalled,

    /// A faster request replaced the active listener; the old one was
    /// cancelled before the swap.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: new listener frequency
    /// - `active_hz`: frequency of the listener that was replaced
    ListenerReplaced,

    /// A listener was explicitly removed.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `rate_hz`: frequency of the removed listener
    ListenerRemoved,

    // === Delivery events ===
    /// A frame arrived for a listener that was already cancelled and was
    /// dropped instead of written to the store.
    ///
    /// Sets:
    /// - `message`: message name
    StaleFrameDropped,

    /// A consumer joined a message name's fan-out set.
    ///
    /// Sets:
    /// - `message`: message name
    /// - `consumer`: consumer name
    ConsumerAttached,

    /// A consumer dropped an update (queue full or worker closed).
    ///
    /// Sets:
    /// - `message`: message name
    /// - `consumer`: consumer name
    /// - `reason`: reason string ("full", "closed")
    ConsumerOverflow,

    /// A consumer panicked while handling an update.
    ///
    /// Sets:
    /// - `consumer`: consumer name
    /// - `reason`: panic info/message
    ConsumerPanicked,

    // === Lifecycle events ===
    /// Shutdown started; no further subscriptions are accepted.
    ShutdownRequested,

    /// All listener forwarders exited within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some forwarders did not exit in time.
    GraceExceeded,
}

/// Arbitration event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Message name, if applicable.
    pub message: Option<Arc<str>>,
    /// Requested (or installed) rate in Hz.
    pub rate_hz: Option<f64>,
    /// The rate that was already in place (coalesce/replace).
    pub active_hz: Option<f64>,
    /// Consumer name, if applicable.
    pub consumer: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            message: None,
            rate_hz: None,
            active_hz: None,
            consumer: None,
            reason: None,
        }
    }

    /// Attaches a message name.
    #[inline]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the requested/installed rate.
    #[inline]
    pub fn with_rate(mut self, hz: f64) -> Self {
        self.rate_hz = Some(hz);
        self
    }

    /// Attaches the rate that was already active.
    #[inline]
    pub fn with_active_rate(mut self, hz: f64) -> Self {
        self.active_hz = Some(hz);
        self
    }

    /// Attaches a consumer name.
    #[inline]
    pub fn with_consumer(mut self, consumer: impl Into<Arc<str>>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a consumer overflow event.
    #[inline]
    pub fn consumer_overflow(message: &Arc<str>, consumer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ConsumerOverflow)
            .with_message(Arc::clone(message))
            .with_consumer(consumer)
            .with_reason(reason)
    }

    /// Creates a consumer panic event.
    #[inline]
    pub fn consumer_panicked(consumer: &'static str, info: String) -> Self {
        Event::new(EventKind::ConsumerPanicked)
            .with_consumer(consumer)
            .with_reason(info)
    }
}
