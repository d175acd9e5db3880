//! Latest-value message cache.
//!
//! This module provides the read side of the system:
//! - [`StoredMessage`] - the most recent value received for one message name,
//!   plus metadata
//! - [`MessageStore`] - name → [`StoredMessage`] mapping with synchronous,
//!   never-blocking reads

mod message;
mod store;

pub use message::StoredMessage;
pub use store::MessageStore;
