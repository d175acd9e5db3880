//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the subscription arbiter.
//!
//! Config is consumed once at construction time:
//! `Arbiter::builder(config, transport).build()`.
//!
//! ## Sentinel values
//! - `consumer_queue_capacity = 0` → clamped to 1 (a consumer queue must hold
//!   at least the latest update)
//! - `grace = 0s` → no wait; shutdown reports stuck listeners immediately

use std::time::Duration;

/// Global configuration for the subscription arbiter runtime.
///
/// Defines:
/// - **Event system**: bus capacity for arbitration/lifecycle events
/// - **Delivery**: per-consumer queue depth and per-subscription frame buffer
/// - **Shutdown behavior**: grace period for listener teardown
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped)
/// - `consumer_queue_capacity`: Default queue depth per attached consumer,
///   used when a consumer does not declare its own (min 1; clamped)
/// - `frame_buffer`: Bounded channel depth between the transport link and each
///   listener; the link sees backpressure past this point (min 1; clamped)
/// - `grace`: Maximum wait for listener forwarders to exit on shutdown
///   (`0s` = don't wait)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow event receivers that lag behind more than `bus_capacity` events
    /// will observe `Lagged` and skip older items. Minimum value is 1
    /// (enforced by the bus).
    pub bus_capacity: usize,

    /// Default per-consumer delivery queue depth.
    ///
    /// Applied when a consumer's `queue_capacity()` returns the inherit
    /// sentinel (`0`). When a consumer's queue is full, updates for that
    /// consumer are dropped and a `ConsumerOverflow` event is published.
    pub consumer_queue_capacity: usize,

    /// Frame channel depth between the transport link and each listener.
    ///
    /// One bounded channel exists per active subscription. A full channel
    /// applies backpressure to the link; the link decides whether to drop or
    /// coalesce frames past that point.
    pub frame_buffer: usize,

    /// Maximum time to wait for listener forwarders to exit during shutdown.
    ///
    /// When `shutdown()` is called:
    /// - All listeners are cancelled via their `CancellationToken`
    /// - The arbiter waits up to `grace` for forwarder tasks to exit
    /// - If the timeout elapses, returns `RuntimeError::GraceExceeded`
    pub grace: Duration,
}

impl Config {
    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the default consumer queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn consumer_queue_clamped(&self) -> usize {
        self.consumer_queue_capacity.max(1)
    }

    /// Returns the frame buffer depth clamped to a minimum of 1.
    #[inline]
    pub fn frame_buffer_clamped(&self) -> usize {
        self.frame_buffer.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024` (good baseline)
    /// - `consumer_queue_capacity = 64` (latest-value delivery tolerates drops)
    /// - `frame_buffer = 16` (per-subscription link buffer)
    /// - `grace = 5s` (listener forwarders exit promptly on cancellation)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            consumer_queue_capacity: 64,
            frame_buffer: 16,
            grace: Duration::from_secs(5),
        }
    }
}
