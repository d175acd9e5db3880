//! # Transport link contract.
//!
//! [`TransportLink`] is the boundary to the external component bridging this
//! core to the vehicle-control message stream. The link's codec has already
//! decoded the wire format; this crate only ever sees [`Frame`]s.
//!
//! ## Contract
//! - `set_rate` is **best-effort and idempotent**: the arbiter re-issues it on
//!   every request so the link always hears the latest ask. Failures are
//!   reported, never fatal to local bookkeeping.
//! - `subscribe` returns the receiving half of a bounded frame channel. The
//!   link must stop delivering for that subscription once the receiver is
//!   dropped — dropping it *is* the unsubscribe signal.
//! - The link delivers frames from its own execution context; no assumption
//!   is made about which task or thread sends.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// One decoded message pushed by the transport link.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Message name this frame belongs to.
    pub message: Arc<str>,
    /// Decoded payload (opaque to the core).
    pub payload: Value,
    /// When the link produced the frame.
    pub at: SystemTime,
}

impl Frame {
    /// Creates a frame stamped with the current wall-clock time.
    pub fn now(message: impl Into<Arc<str>>, payload: Value) -> Self {
        Self {
            message: message.into(),
            payload,
            at: SystemTime::now(),
        }
    }
}

/// Contract for the external vehicle-control link.
///
/// Implementations bridge to the actual REST/websocket transport; they are
/// expected to be cheap to share (`Arc`) and callable from any task.
#[async_trait]
pub trait TransportLink: Send + Sync + 'static {
    /// Asks the link to deliver `message` at `hz`.
    ///
    /// Best-effort: the arbiter treats failure as non-fatal and proceeds with
    /// local bookkeeping, expecting the link to recover.
    async fn set_rate(&self, message: &str, hz: f64) -> Result<(), TransportError>;

    /// Opens a subscription for `message`.
    ///
    /// Frames arrive on the returned channel, bounded at `frame_buffer`; a
    /// full channel applies backpressure to the link. Dropping the receiver
    /// ends the subscription.
    async fn subscribe(
        &self,
        message: &str,
        frame_buffer: usize,
    ) -> Result<mpsc::Receiver<Frame>, TransportError>;
}
