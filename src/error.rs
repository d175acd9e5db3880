//! Error types used by the msgvisor runtime and the transport boundary.
//!
//! This module defines three error enums:
//!
//! - [`ArbiterError`] — errors returned to callers of the subscription arbiter.
//! - [`TransportError`] — failures reported by the external transport link.
//! - [`RuntimeError`] — errors raised by the runtime lifecycle itself.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by [`Arbiter::request_rate`](crate::Arbiter::request_rate).
///
/// Invalid input is rejected synchronously at the call boundary; transport
/// failures during subscription setup are surfaced here. Rate-command failures
/// are *not* — those are best-effort and reported on the event bus only.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ArbiterError {
    /// The requested delivery rate is negative or not a finite number.
    #[error("invalid rate requested for message {message}@{rate_hz}Hz")]
    InvalidRate {
        /// Message name the request was for.
        message: String,
        /// The rejected rate.
        rate_hz: f64,
    },

    /// The transport link could not set up the subscription.
    #[error("transport link failed: {0}")]
    Transport(#[from] TransportError),

    /// The arbiter has been shut down; no further subscriptions are accepted.
    #[error("arbiter is shut down")]
    ShutDown,
}

impl ArbiterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use msgvisor::ArbiterError;
    ///
    /// let err = ArbiterError::InvalidRate { message: "ATTITUDE".into(), rate_hz: -1.0 };
    /// assert_eq!(err.as_label(), "invalid_rate");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ArbiterError::InvalidRate { .. } => "invalid_rate",
            ArbiterError::Transport(_) => "transport_failed",
            ArbiterError::ShutDown => "arbiter_shut_down",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ArbiterError::InvalidRate { message, rate_hz } => {
                format!("invalid rate {rate_hz}Hz for message {message}")
            }
            ArbiterError::Transport(e) => format!("transport: {e}"),
            ArbiterError::ShutDown => "arbiter is shut down".to_string(),
        }
    }
}

/// # Failures at the transport-link boundary.
///
/// Produced by [`TransportLink`](crate::TransportLink) implementations. Rate
/// commands are best-effort and non-fatal to the arbiter; subscription
/// failures abort the request that needed them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// The "set message rate" command was not accepted by the link.
    #[error("rate command rejected for {message}: {reason}")]
    RateCommand {
        /// Message name the command was for.
        message: String,
        /// Link-specific failure description.
        reason: String,
    },

    /// The link could not create a subscription for the message name.
    #[error("subscribe failed for {message}: {reason}")]
    Subscribe {
        /// Message name the subscription was for.
        message: String,
        /// Link-specific failure description.
        reason: String,
    },

    /// The link is closed and will not deliver any further frames.
    #[error("transport link closed")]
    LinkClosed,
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::RateCommand { .. } => "transport_rate_command",
            TransportError::Subscribe { .. } => "transport_subscribe",
            TransportError::LinkClosed => "transport_link_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TransportError::RateCommand { message, reason } => {
                format!("rate command for {message}: {reason}")
            }
            TransportError::Subscribe { message, reason } => {
                format!("subscribe for {message}: {reason}")
            }
            TransportError::LinkClosed => "link closed".to_string(),
        }
    }
}

/// # Errors produced by the runtime lifecycle.
///
/// These represent failures of the shutdown sequence, such as listener
/// forwarders that did not exit within the configured grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some listeners remained stuck.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Message names whose listeners did not shut down in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use msgvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck listeners={stuck:?}")
            }
        }
    }
}
