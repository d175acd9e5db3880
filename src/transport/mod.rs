//! Transport-link boundary.
//!
//! The vehicle-control link lives outside this crate; [`TransportLink`] is
//! the seam it plugs into:
//! - [`TransportLink`] - set-rate commands and per-name subscriptions
//! - [`Frame`] - one decoded message pushed by the link
//! - [`MockLink`] - scripted in-memory link for tests (`mock` feature)

mod link;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use link::{Frame, TransportLink};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLink;
