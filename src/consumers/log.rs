//! # Simple logging listener for debugging and demos.
//!
//! [`LogWriter`] prints arbitration events to stdout in a human-readable
//! format. This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [rate-requested] message=ATTITUDE rate=10Hz
//! [coalesced] message=ATTITUDE active=10Hz requested=2Hz
//! [installed] message=ATTITUDE rate=10Hz
//! [replaced] message=ATTITUDE rate=10Hz previous=2Hz
//! [removed] message=ATTITUDE
//! [rate-command-failed] message=ATTITUDE rate=10Hz err="link down"
//! [stale-frame-dropped] message=ATTITUDE
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! ```

use tokio::sync::broadcast;

use crate::events::{Event, EventKind};

/// Simple stdout logging listener.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - drive your own structured logging or
/// metrics off [`Arbiter::events`](crate::Arbiter::events) instead.
pub struct LogWriter;

impl LogWriter {
    /// Spawns a background task that drains `rx` and prints each event.
    ///
    /// The task exits when the bus is dropped.
    pub fn spawn_listener(mut rx: broadcast::Receiver<Event>) {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => Self::write(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn write(e: &Event) {
        match e.kind {
            EventKind::RateRequested => {
                if let (Some(message), Some(hz)) = (&e.message, e.rate_hz) {
                    println!("[rate-requested] message={message} rate={hz}Hz");
                }
            }
            EventKind::RequestRejected => {
                println!(
                    "[request-rejected] message={:?} rate={:?} reason={:?}",
                    e.message, e.rate_hz, e.reason
                );
            }
            EventKind::RequestCoalesced => {
                println!(
                    "[coalesced] message={:?} active={:?}Hz requested={:?}Hz",
                    e.message, e.active_hz, e.rate_hz
                );
            }
            EventKind::RateCommandFailed => {
                println!(
                    "[rate-command-failed] message={:?} rate={:?} err={:?}",
                    e.message, e.rate_hz, e.reason
                );
            }
            EventKind::ListenerInstalled => {
                if let (Some(message), Some(hz)) = (&e.message, e.rate_hz) {
                    println!("[installed] message={message} rate={hz}Hz");
                }
            }
            EventKind::ListenerReplaced => {
                println!(
                    "[replaced] message={:?} rate={:?}Hz previous={:?}Hz",
                    e.message, e.rate_hz, e.active_hz
                );
            }
            EventKind::ListenerRemoved => {
                println!("[removed] message={:?}", e.message);
            }
            EventKind::StaleFrameDropped => {
                println!("[stale-frame-dropped] message={:?}", e.message);
            }
            EventKind::ConsumerAttached => {
                println!(
                    "[consumer-attached] message={:?} consumer={:?}",
                    e.message, e.consumer
                );
            }
            EventKind::ConsumerOverflow => {
                println!(
                    "[consumer-overflow] consumer={:?} reason={:?}",
                    e.consumer, e.reason
                );
            }
            EventKind::ConsumerPanicked => {
                println!(
                    "[consumer-panicked] consumer={:?} info={:?}",
                    e.consumer, e.reason
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
        }
    }
}
