//! # Stored message snapshot.
//!
//! [`StoredMessage`] is the unit held by the [`MessageStore`](super::MessageStore)
//! and handed to consumers on each delivery. The payload shape is
//! message-kind-specific and opaque to this crate; the link's codec has already
//! decoded it into JSON by the time it arrives here.

use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;

/// Most recent value received for one message name.
///
/// Overwritten in place on every arrival; never deleted. `Serialize` is
/// derived so snapshots can go straight back out over the bridge.
#[derive(Clone, Debug, Serialize)]
pub struct StoredMessage {
    /// Message name this value belongs to.
    pub message: String,
    /// Last decoded payload (opaque to the core).
    pub payload: Value,
    /// When the value arrived.
    pub received_at: SystemTime,
    /// The delivery rate that produced this value.
    pub requested_rate_hz: f64,
}
