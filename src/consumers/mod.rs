//! # Update consumers for delivered telemetry.
//!
//! This module provides the [`Consume`] trait and the per-message-name
//! fan-out machinery that pushes each stored update to every attached
//! consumer.
//!
//! ## Architecture
//! ```text
//! Delivery flow (one message name):
//!   Listener forwarder ── store.upsert() ──► ConsumerSet::emit(&StoredMessage)
//!                                               │   (Arc-clone per consumer)
//!                                               ├──► [queue C1] ─► worker C1 ─► on_message()
//!                                               ├──► [queue C2] ─► worker C2 ─► on_message()
//!                                               └──► [queue CN] ─► worker CN ─► on_message()
//! ```
//!
//! The set for a message name outlives any individual listener: a promotion
//! replaces the listener but attached consumers keep receiving updates.
//!
//! ## Implementing custom consumers
//! ```no_run
//! use msgvisor::{Consume, StoredMessage};
//! use async_trait::async_trait;
//!
//! struct AttitudeGauge;
//!
//! #[async_trait]
//! impl Consume for AttitudeGauge {
//!     async fn on_message(&self, update: &StoredMessage) {
//!         // refresh the gauge...
//!         let _ = update;
//!     }
//! }
//! ```

mod consume;
#[cfg(feature = "logging")]
mod log;
mod set;

pub use consume::Consume;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::ConsumerSet;
