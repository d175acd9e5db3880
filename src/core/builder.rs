//! # Builder wiring the arbiter's components together.
//!
//! Constructs the event bus, message store, listener registry and runtime
//! cancellation token, then assembles the [`Arbiter`]. Must be called from
//! within a tokio runtime: optional listeners (logging) are spawned at build
//! time.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::Bus;
use crate::store::MessageStore;
use crate::transport::TransportLink;

use super::arbiter::Arbiter;
use super::registry::ListenerRegistry;

/// Builder for constructing an [`Arbiter`] with optional features.
pub struct ArbiterBuilder {
    cfg: Config,
    transport: Arc<dyn TransportLink>,

    #[cfg(feature = "logging")]
    log_writer: bool,
}

impl ArbiterBuilder {
    /// Creates a new builder over the given configuration and transport link.
    pub fn new(cfg: Config, transport: Arc<dyn TransportLink>) -> Self {
        Self {
            cfg,
            transport,

            #[cfg(feature = "logging")]
            log_writer: false,
        }
    }

    /// Enables the built-in stdout event logger.
    ///
    /// Requires the `logging` feature flag.
    #[cfg(feature = "logging")]
    pub fn with_log_writer(mut self) -> Self {
        self.log_writer = true;
        self
    }

    /// Builds and returns the arbiter instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for arbitration/lifecycle events
    /// - Latest-value message store
    /// - Listener registry with per-name consumer fan-out
    /// - Optional log writer (if enabled)
    pub fn build(self) -> Arc<Arbiter> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let store = Arc::new(MessageStore::new());
        let registry = ListenerRegistry::new(bus.clone(), self.cfg.consumer_queue_clamped());
        let runtime_token = CancellationToken::new();

        #[cfg(feature = "logging")]
        if self.log_writer {
            crate::consumers::LogWriter::spawn_listener(bus.subscribe());
        }

        Arc::new(Arbiter::new_internal(
            self.cfg,
            bus,
            store,
            registry,
            self.transport,
            runtime_token,
        ))
    }
}
