//! # msgvisor
//!
//! **msgvisor** is a message-subscription arbitration library for telemetry
//! streams.
//!
//! It sits between consumers that want a named telemetry message at some rate
//! and the external vehicle-control link that actually delivers it. Many
//! consumers may ask for the same message at different rates; msgvisor keeps
//! exactly one live subscription per message name, at the highest rate anyone
//! asked for, and gives everyone a single authoritative latest value.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   consumer A          consumer B          consumer C
//! (ATTITUDE@2Hz)     (ATTITUDE@10Hz)     (GPS_RAW_INT@1Hz)
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Arbiter (arbitration engine)                                     │
//! │  - Bus (broadcast arbitration events)                             │
//! │  - ListenerRegistry (one active Listener per message name)        │
//! │  - MessageStore (name → latest value, sync reads)                 │
//! │  - ConsumerSet per name (fans out updates to consumers)           │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//! ┌──────────────────┐        ┌──────────────────┐
//! │ Listener         │        │ Listener         │
//! │ ATTITUDE @ 10Hz  │        │ GPS_RAW_INT @ 1Hz│
//! └──────┬───────────┘        └──────┬───────────┘
//!        │ bounded frame channel     │
//!        ▼                           ▼
//! ┌───────────────────────────────────────────────┐
//! │  TransportLink (external vehicle-control      │
//! │  bridge: set_rate commands, frame delivery)   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ### Arbitration (monotonic-max)
//! ```text
//! request_rate(message, hz, consumer)
//!   ├─► hz invalid (negative / non-finite) ─► InvalidRate, nothing touched
//!   ├─► transport.set_rate(message, hz)      (always; best-effort)
//!   └─► registry lookup:
//!         ├─ active listener ≥ hz ─► Coalesced (never demote); consumer
//!         │                          still attached to the fan-out
//!         └─ none, or slower ─► new Listener @ hz, old one cancelled
//!                               *before* the swap completes
//!
//! frame arrival ─► cancellation gate ─► MessageStore.upsert ─► fan-out
//! ```
//!
//! A cancelled listener never writes: a late in-flight frame is dropped, so
//! the store cannot go backwards across a promotion.
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                  |
//! |-----------------|----------------------------------------------------------|-------------------------------------|
//! | **Arbitration** | One subscription per name at the fastest requested rate. | [`Arbiter`], [`RateDecision`]       |
//! | **Read side**   | Latest-value cache, synchronous and never blocking.      | [`MessageStore`], [`StoredMessage`] |
//! | **Push side**   | Per-name fan-out with bounded per-consumer queues.       | [`Consume`], [`ConsumerSet`]        |
//! | **Transport**   | Seam to the external vehicle-control bridge.             | [`TransportLink`], [`Frame`]        |
//! | **Events**      | Observability for every arbitration decision.            | [`Event`], [`EventKind`], [`Bus`]   |
//! | **Errors**      | Typed errors per boundary.                               | [`ArbiterError`], [`TransportError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `mock`: exports [`MockLink`], a scripted transport for integration tests.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use tokio::sync::mpsc;
//!
//! use msgvisor::{Arbiter, Config, Frame, TransportError, TransportLink};
//!
//! // Minimal link: accepts every rate command, delivers nothing.
//! struct NullLink(std::sync::Mutex<Vec<mpsc::Sender<Frame>>>);
//!
//! #[async_trait]
//! impl TransportLink for NullLink {
//!     async fn set_rate(&self, _message: &str, _hz: f64) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!
//!     async fn subscribe(
//!         &self,
//!         _message: &str,
//!         frame_buffer: usize,
//!     ) -> Result<mpsc::Receiver<Frame>, TransportError> {
//!         let (tx, rx) = mpsc::channel(frame_buffer);
//!         self.0.lock().unwrap().push(tx);
//!         Ok(rx)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = Arc::new(NullLink(std::sync::Mutex::new(Vec::new())));
//!     let arbiter = Arbiter::builder(Config::default(), link).build();
//!
//!     // Two consumers, one message: the faster request wins, nobody demotes.
//!     arbiter.request_rate("ATTITUDE", 2.0, None).await?;
//!     arbiter.request_rate("ATTITUDE", 10.0, None).await?;
//!     assert_eq!(arbiter.current_frequency("ATTITUDE").await, Some(10.0));
//!
//!     // Nothing received yet: absence is a normal outcome, not an error.
//!     assert!(arbiter.read_latest("ATTITUDE").is_none());
//!
//!     arbiter.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod consumers;
mod core;
mod error;
mod events;
mod store;
mod transport;

// ---- Public re-exports ----

pub use config::Config;
pub use consumers::{Consume, ConsumerSet};
pub use core::{Arbiter, ArbiterBuilder, Listener, RateDecision};
pub use error::{ArbiterError, RuntimeError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use store::{MessageStore, StoredMessage};
pub use transport::{Frame, TransportLink};

// Optional: expose a scripted transport for integration tests.
// Enable with: `--features mock`
#[cfg(any(test, feature = "mock"))]
pub use transport::MockLink;

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use consumers::LogWriter;
