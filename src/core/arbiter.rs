//! # Arbiter: the subscription-arbitration entry point.
//!
//! The [`Arbiter`] owns the event bus, the [`MessageStore`] and the listener
//! registry. Consumers ask it for `(message, rate)`; it decides whether to
//! reuse, upgrade or reject, and wires each listener's delivery path into the
//! store and the per-name consumer fan-out.
//!
//! ## High-level architecture
//! ```text
//! Inputs:
//!   request_rate(message, hz, consumer)
//!       │
//!       ├─► validate hz (negative/non-finite → InvalidRate, nothing touched)
//!       ├─► transport.set_rate(message, hz)      (always; best-effort)
//!       ├─► registry.current_frequency(message)
//!       │     ├─ active ≥ requested ──► RequestCoalesced, attach consumer,
//!       │     │                         done (monotonic-max: never demote)
//!       │     └─ none / slower ──► transport.subscribe(message)
//!       │                           └─► Listener::spawn(...)
//!       │                                └─► registry.install(listener)
//!       │                                      (old listener cancelled
//!       │                                       before the swap completes)
//!       └─► RateDecision::{Installed, Replaced, Coalesced}
//!
//! Delivery:
//!   link ─► frame channel ─► forwarder ─► store.upsert ─► ConsumerSet::emit
//!                                                             │
//!                                              consumers (bounded queues)
//!
//! Shutdown path:
//!   shutdown()
//!     └─► runtime_token.cancel()  → propagates to listener child tokens
//!     └─► drain registry, join forwarders within Config::grace:
//!            ├─ all joined     → AllStoppedWithin
//!            └─ grace exceeded → GraceExceeded { stuck message names }
//! ```
//!
//! ## Rules
//! - A lower-than-active request never demotes the listener; the fastest
//!   outstanding consumer wins.
//! - No rate decay and no listener garbage collection: a listener lives until
//!   an explicit [`remove`](Arbiter::remove), a faster replacement, or
//!   shutdown.
//! - Transport rate-command failures are reported on the bus and do not stop
//!   local bookkeeping; store readers always see the last good value.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::consumers::Consume;
use crate::error::{ArbiterError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::store::{MessageStore, StoredMessage};
use crate::transport::TransportLink;

use super::builder::ArbiterBuilder;
use super::listener::Listener;
use super::registry::{InstallOutcome, ListenerRegistry};

/// How a rate request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
    /// A new listener was installed for a previously unsubscribed message.
    Installed,
    /// A faster request replaced the active listener.
    Replaced {
        /// Frequency of the listener that was cancelled.
        previous_hz: f64,
    },
    /// An active listener at an equal or higher rate already satisfies the
    /// request; no new subscription was created.
    Coalesced {
        /// Frequency of the listener that stays in place.
        active_hz: f64,
    },
}

/// Arbitrates message-rate requests and owns the delivery plumbing.
///
/// Construct once per process via [`Arbiter::builder`] and share the returned
/// `Arc` with consumers; there is no implicit global instance.
pub struct Arbiter {
    cfg: Config,
    bus: Bus,
    store: Arc<MessageStore>,
    registry: ListenerRegistry,
    transport: Arc<dyn TransportLink>,
    runtime_token: CancellationToken,
}

impl Arbiter {
    /// Starts building an arbiter over the given transport link.
    pub fn builder(cfg: Config, transport: Arc<dyn TransportLink>) -> ArbiterBuilder {
        ArbiterBuilder::new(cfg, transport)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        store: Arc<MessageStore>,
        registry: ListenerRegistry,
        transport: Arc<dyn TransportLink>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            store,
            registry,
            transport,
            runtime_token,
        }
    }

    /// Requests delivery of `message` at `desired_hz`, optionally attaching a
    /// push consumer.
    ///
    /// The decision follows the monotonic-max policy: the fastest outstanding
    /// request per message name wins and is never demoted. See the module
    /// docs for the full flow. `consumer` (if any) is attached to the
    /// message's fan-out set in **every** successful branch — a coalesced
    /// caller still receives deliveries from the faster shared listener.
    ///
    /// # Errors
    /// - [`ArbiterError::InvalidRate`] — `desired_hz` negative or not finite;
    ///   registry and transport untouched.
    /// - [`ArbiterError::Transport`] — the link refused the subscription (the
    ///   best-effort rate command is *not* an error source; its failures are
    ///   only published on the bus).
    /// - [`ArbiterError::ShutDown`] — after [`shutdown`](Arbiter::shutdown).
    pub async fn request_rate(
        &self,
        message: &str,
        desired_hz: f64,
        consumer: Option<Arc<dyn Consume>>,
    ) -> Result<RateDecision, ArbiterError> {
        if self.runtime_token.is_cancelled() {
            return Err(ArbiterError::ShutDown);
        }

        self.bus.publish(
            Event::new(EventKind::RateRequested)
                .with_message(message)
                .with_rate(desired_hz),
        );

        if !desired_hz.is_finite() || desired_hz < 0.0 {
            self.bus.publish(
                Event::new(EventKind::RequestRejected)
                    .with_message(message)
                    .with_rate(desired_hz)
                    .with_reason("invalid_rate"),
            );
            return Err(ArbiterError::InvalidRate {
                message: message.to_string(),
                rate_hz: desired_hz,
            });
        }

        // Always issued, even when the local listener ends up deduplicated:
        // the link stays informed of the latest ask, and the command is
        // idempotent on its side.
        if let Err(err) = self.transport.set_rate(message, desired_hz).await {
            self.bus.publish(
                Event::new(EventKind::RateCommandFailed)
                    .with_message(message)
                    .with_rate(desired_hz)
                    .with_reason(err.as_message()),
            );
        }

        if let Some(active_hz) = self.registry.current_frequency(message).await {
            if active_hz >= desired_hz {
                self.bus.publish(
                    Event::new(EventKind::RequestCoalesced)
                        .with_message(message)
                        .with_rate(desired_hz)
                        .with_active_rate(active_hz),
                );
                if let Some(consumer) = consumer {
                    self.registry.consumers(message).attach(consumer);
                }
                return Ok(RateDecision::Coalesced { active_hz });
            }
        }

        let consumers = self.registry.consumers(message);
        let rx = self
            .transport
            .subscribe(message, self.cfg.frame_buffer_clamped())
            .await?;
        let listener = Listener::spawn(
            Arc::from(message),
            desired_hz,
            rx,
            Arc::clone(&self.store),
            Arc::clone(&consumers),
            self.bus.clone(),
            &self.runtime_token,
        );
        let outcome = self.registry.install(listener).await;

        if let Some(consumer) = consumer {
            consumers.attach(consumer);
        }

        Ok(match outcome {
            InstallOutcome::Installed => RateDecision::Installed,
            InstallOutcome::Replaced { previous_hz } => RateDecision::Replaced { previous_hz },
            InstallOutcome::Lost { active_hz } => {
                // A concurrent caller won with a faster/equal listener, which
                // satisfies this request too.
                self.bus.publish(
                    Event::new(EventKind::RequestCoalesced)
                        .with_message(message)
                        .with_rate(desired_hz)
                        .with_active_rate(active_hz),
                );
                RateDecision::Coalesced { active_hz }
            }
        })
    }

    /// Attaches a push consumer to `message`'s fan-out set without touching
    /// the subscription itself.
    ///
    /// Useful for observers that want deliveries only if someone else pays
    /// for the rate.
    pub fn attach(&self, message: &str, consumer: Arc<dyn Consume>) {
        self.registry.consumers(message).attach(consumer);
    }

    /// Returns the most recent locally cached value for `message`.
    ///
    /// Synchronous and never blocking on network I/O; `None` means the
    /// message was never received (a normal outcome, not an error).
    pub fn read_latest(&self, message: &str) -> Option<StoredMessage> {
        self.store.get(message)
    }

    /// Handle to the underlying latest-value store.
    pub fn store(&self) -> Arc<MessageStore> {
        Arc::clone(&self.store)
    }

    /// Frequency of the active listener for `message`, if any.
    pub async fn current_frequency(&self, message: &str) -> Option<f64> {
        self.registry.current_frequency(message).await
    }

    /// Sorted names of messages with an active listener.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Cancels and removes the listener for `message`.
    ///
    /// Returns `false` if none was active. The cached value (if any) stays
    /// readable; attached consumers stay connected and resume on the next
    /// install.
    pub async fn remove(&self, message: &str) -> bool {
        self.registry.remove(message).await
    }

    /// Creates a receiver observing subsequent arbitration events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Shuts the arbiter down: cancels every listener and waits up to
    /// [`Config::grace`] for forwarders and consumer workers to exit.
    ///
    /// Idempotent; later calls return `Ok(())` without further effect.
    /// Requests arriving after this call fail with [`ArbiterError::ShutDown`].
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        if self.runtime_token.is_cancelled() {
            return Ok(());
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let drained = self.registry.drain_all().await;
        let sets = self.registry.consumer_sets();

        let pending: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(
            drained.iter().map(|(name, _)| name.clone()).collect(),
        ));

        let tracker = Arc::clone(&pending);
        let join_all = async move {
            for (name, listener) in drained {
                listener.join().await;
                tracker.lock().unwrap_or_else(|e| e.into_inner()).remove(&name);
            }
            for set in &sets {
                set.shutdown().await;
            }
        };

        match tokio::time::timeout(self.cfg.grace, join_all).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let mut stuck: Vec<String> = pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .iter()
                    .cloned()
                    .collect();
                stuck.sort_unstable();
                Err(RuntimeError::GraceExceeded {
                    grace: self.cfg.grace,
                    stuck,
                })
            }
        }
    }

    /// True if no listener is currently registered.
    pub async fn is_idle(&self) -> bool {
        self.registry.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockLink;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Recorder {
        seen: AtomicUsize,
    }

    impl Recorder {
        fn arc() -> Arc<Self> {
            Arc::new(Self { seen: AtomicUsize::new(0) })
        }
    }

    #[async_trait::async_trait]
    impl Consume for Recorder {
        async fn on_message(&self, _update: &StoredMessage) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn arbiter_over(link: &MockLink) -> Arc<Arbiter> {
        Arbiter::builder(Config::default(), Arc::new(link.clone())).build()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_first_request_installs_listener() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        let decision = arbiter
            .request_rate("ATTITUDE", 2.0, None)
            .await
            .expect("request accepted");

        assert_eq!(decision, RateDecision::Installed);
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(2.0));
        assert_eq!(link.rate_calls(), vec![("ATTITUDE".to_string(), 2.0)]);
        assert_eq!(arbiter.subscriptions().await, vec!["ATTITUDE"]);
    }

    #[tokio::test]
    async fn test_slower_request_never_demotes() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 5.0, None).await.expect("install");
        let decision = arbiter
            .request_rate("ATTITUDE", 2.0, None)
            .await
            .expect("coalesced");

        assert_eq!(decision, RateDecision::Coalesced { active_hz: 5.0 });
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(5.0));
        // The link still heard both asks.
        assert_eq!(
            link.rate_calls(),
            vec![("ATTITUDE".to_string(), 5.0), ("ATTITUDE".to_string(), 2.0)]
        );
        // Only one subscription was ever opened.
        assert_eq!(link.subscription_count("ATTITUDE"), 1);
    }

    #[tokio::test]
    async fn test_faster_request_replaces_listener() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 2.0, None).await.expect("install");
        let decision = arbiter
            .request_rate("ATTITUDE", 9.0, None)
            .await
            .expect("replace");

        assert_eq!(decision, RateDecision::Replaced { previous_hz: 2.0 });
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(9.0));
        assert_eq!(link.subscription_count("ATTITUDE"), 2);
    }

    #[tokio::test]
    async fn test_equal_rate_is_coalesced() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 4.0, None).await.expect("install");
        let decision = arbiter
            .request_rate("ATTITUDE", 4.0, None)
            .await
            .expect("coalesced");

        assert_eq!(decision, RateDecision::Coalesced { active_hz: 4.0 });
        assert_eq!(link.subscription_count("ATTITUDE"), 1);
    }

    #[tokio::test]
    async fn test_negative_rate_is_rejected_untouched() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 5.0, None).await.expect("install");
        let err = arbiter
            .request_rate("ATTITUDE", -1.0, None)
            .await
            .expect_err("negative rate must be rejected");

        assert!(matches!(err, ArbiterError::InvalidRate { rate_hz, .. } if rate_hz == -1.0));
        // Existing listener untouched, no extra transport traffic.
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(5.0));
        assert_eq!(link.rate_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_command_failure_is_non_fatal() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);
        let mut events = arbiter.events();

        link.fail_rate_commands(true);
        let decision = arbiter
            .request_rate("ATTITUDE", 3.0, None)
            .await
            .expect("bookkeeping proceeds");

        assert_eq!(decision, RateDecision::Installed);
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(3.0));

        let mut saw_failure = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::RateCommandFailed {
                saw_failure = true;
            }
        }
        assert!(saw_failure, "expected a RateCommandFailed event");
    }

    #[tokio::test]
    async fn test_subscribe_failure_installs_nothing() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        link.fail_subscribe(true);
        let err = arbiter
            .request_rate("ATTITUDE", 3.0, None)
            .await
            .expect_err("subscribe failure is fatal to the request");

        assert!(matches!(err, ArbiterError::Transport(_)));
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, None);
        assert!(arbiter.is_idle().await);
    }

    #[tokio::test]
    async fn test_attitude_promotion_scenario() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        // Consumer A at 2 Hz, consumer B at 10 Hz.
        let a = Recorder::arc();
        let b = Recorder::arc();
        arbiter
            .request_rate("ATTITUDE", 2.0, Some(a.clone()))
            .await
            .expect("install L1");
        arbiter
            .request_rate("ATTITUDE", 10.0, Some(b.clone()))
            .await
            .expect("replace with L2");

        // A frame arrives via the live (10 Hz) subscription.
        let delivered = link.push("ATTITUDE", json!({"roll": 0.1})).await;
        assert_eq!(delivered, 1, "only the live subscription accepts frames");
        settle().await;

        let latest = arbiter.read_latest("ATTITUDE").expect("cached value");
        assert_eq!(latest.payload, json!({"roll": 0.1}));
        assert_eq!(latest.requested_rate_hz, 10.0);

        // A stale in-flight frame aimed at the cancelled subscription
        // changes nothing.
        let accepted = link.push_to("ATTITUDE", 0, json!({"roll": 9.9})).await;
        assert!(!accepted, "cancelled subscription no longer accepts frames");
        settle().await;
        let latest = arbiter.read_latest("ATTITUDE").expect("cached value");
        assert_eq!(latest.payload, json!({"roll": 0.1}));
        assert_eq!(latest.requested_rate_hz, 10.0);

        // Both consumers kept receiving across the promotion.
        assert!(a.seen.load(Ordering::SeqCst) >= 1);
        assert!(b.seen.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_read_latest_overwrites_not_accumulates() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        assert!(arbiter.read_latest("VFR_HUD").is_none());

        arbiter.request_rate("VFR_HUD", 1.0, None).await.expect("install");
        link.push("VFR_HUD", json!({"airspeed": 11.0})).await;
        settle().await;
        assert_eq!(
            arbiter.read_latest("VFR_HUD").expect("first").payload,
            json!({"airspeed": 11.0})
        );

        link.push("VFR_HUD", json!({"airspeed": 12.5})).await;
        settle().await;
        assert_eq!(
            arbiter.read_latest("VFR_HUD").expect("second").payload,
            json!({"airspeed": 12.5})
        );
        assert_eq!(arbiter.store().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_cache_readable() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("HEARTBEAT", 1.0, None).await.expect("install");
        link.push("HEARTBEAT", json!({"type": 2})).await;
        settle().await;

        assert!(arbiter.remove("HEARTBEAT").await);
        assert!(!arbiter.remove("HEARTBEAT").await, "second remove is a no-op");
        assert_eq!(arbiter.current_frequency("HEARTBEAT").await, None);
        // Stale-but-present beats failing reads.
        assert_eq!(
            arbiter.read_latest("HEARTBEAT").expect("cache survives").payload,
            json!({"type": 2})
        );
    }

    #[tokio::test]
    async fn test_no_listener_garbage_collection() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 8.0, None).await.expect("install");
        // Consumers losing interest is invisible to the arbiter; the listener
        // stays until an explicit remove or a faster replacement.
        settle().await;
        assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(8.0));
        assert_eq!(arbiter.subscriptions().await, vec!["ATTITUDE"]);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_later_requests() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 2.0, None).await.expect("install");
        arbiter.shutdown().await.expect("clean shutdown");
        arbiter.shutdown().await.expect("idempotent");

        assert!(arbiter.is_idle().await);
        let err = arbiter
            .request_rate("ATTITUDE", 2.0, None)
            .await
            .expect_err("no requests after shutdown");
        assert!(matches!(err, ArbiterError::ShutDown));
    }

    #[tokio::test]
    async fn test_coalesced_consumer_still_receives() {
        let link = MockLink::new();
        let arbiter = arbiter_over(&link);

        arbiter.request_rate("ATTITUDE", 10.0, None).await.expect("install");
        let late = Recorder::arc();
        let decision = arbiter
            .request_rate("ATTITUDE", 1.0, Some(late.clone()))
            .await
            .expect("coalesced");
        assert_eq!(decision, RateDecision::Coalesced { active_hz: 10.0 });

        link.push("ATTITUDE", json!({"roll": 0.5})).await;
        settle().await;
        assert_eq!(
            late.seen.load(Ordering::SeqCst),
            1,
            "coalesced caller must still get deliveries"
        );
    }
}
