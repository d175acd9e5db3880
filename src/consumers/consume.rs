//! # Core consumer trait
//!
//! `Consume` is the extension point for receiving pushed telemetry updates.
//! Each consumer is driven by a dedicated worker loop fed by a bounded queue
//! owned by the [`ConsumerSet`](crate::consumers::ConsumerSet) for its
//! message name.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, rendering) – they do **not**
//!   block the listener forwarder nor other consumers.
//! - Each consumer **declares** its preferred queue capacity via
//!   [`Consume::queue_capacity`]. If a queue overflows, updates for that
//!   consumer are **dropped** (a `ConsumerOverflow` event is published);
//!   the latest value is always available via
//!   [`Arbiter::read_latest`](crate::Arbiter::read_latest).

use async_trait::async_trait;

use crate::store::StoredMessage;

/// Contract for telemetry update consumers.
///
/// Called from a consumer-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Consume: Send + Sync + 'static {
    /// Handle one stored update for this consumer.
    ///
    /// # Parameters
    /// - `update`: Reference to the stored snapshot (does not transfer ownership)
    async fn on_message(&self, update: &StoredMessage);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this consumer's queue.
    ///
    /// `0` inherits the arbiter's configured default
    /// (`Config::consumer_queue_capacity`). On overflow, updates for this
    /// consumer are dropped.
    fn queue_capacity(&self) -> usize {
        0
    }
}
