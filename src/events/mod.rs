//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to arbitration events emitted by the arbiter, registry,
//! listeners and consumer workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Arbiter`, `ListenerRegistry`, listener forwarders,
//!   `ConsumerSet` workers (overflow/panic).
//! - **Consumers**: anything holding a receiver from
//!   [`Arbiter::events`](crate::Arbiter::events), e.g. the optional
//!   `LogWriter` (`logging` feature).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
