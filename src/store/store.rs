//! # Message store - latest-value cache with synchronous reads.
//!
//! [`MessageStore`] maps message name → most recently received value. Writes
//! are unconditional overwrites performed by listener forwarders; reads come
//! from arbitrary threads and never touch the network.
//!
//! ## Rules
//! - **Overwrite, not accumulate**: one value per name, replaced on arrival.
//! - **Process-lifetime**: entries are never deleted, even after the listener
//!   that produced them is removed (stale-but-present beats failing reads).
//! - **Absence is normal**: `get` on a never-received name returns `None`;
//!   that is a caller-observable precondition, not an error.
//!
//! The map is guarded by a `std::sync::RwLock`: the critical sections are a
//! handful of instructions and callers must be able to read without an async
//! context.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use serde_json::Value;

use super::message::StoredMessage;

/// Shared latest-value cache, name → [`StoredMessage`].
///
/// Thread-safe for concurrent reads and writes. Writers are the listener
/// forwarders (one per active subscription); readers are arbitrary.
#[derive(Debug, Default)]
pub struct MessageStore {
    inner: RwLock<HashMap<String, StoredMessage>>,
}

impl MessageStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Overwrites the value for `message`, returning the stored snapshot.
    ///
    /// The returned snapshot is what fan-out hands to consumers, so delivery
    /// and the cache can never disagree about a given arrival.
    pub fn upsert(
        &self,
        message: &str,
        payload: Value,
        requested_rate_hz: f64,
        received_at: SystemTime,
    ) -> StoredMessage {
        let stored = StoredMessage {
            message: message.to_string(),
            payload,
            received_at,
            requested_rate_hz,
        };
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(stored.message.clone(), stored.clone());
        stored
    }

    /// Returns the most recent value for `message`, if any was ever received.
    ///
    /// Never blocks on network I/O; subscription state is irrelevant.
    pub fn get(&self, message: &str) -> Option<StoredMessage> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(message).cloned()
    }

    /// Returns the sorted list of message names with at least one value.
    pub fn names(&self) -> Vec<String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of distinct message names held.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True if no message has ever been received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_before_any_arrival_is_absent() {
        let store = MessageStore::new();
        assert!(store.get("ATTITUDE").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let store = MessageStore::new();
        store.upsert("ATTITUDE", json!({"roll": 0.1}), 2.0, SystemTime::now());
        store.upsert("ATTITUDE", json!({"roll": 0.2}), 2.0, SystemTime::now());

        let got = store.get("ATTITUDE").expect("value present");
        assert_eq!(got.payload, json!({"roll": 0.2}));
        assert_eq!(store.len(), 1, "overwrite must not accumulate entries");
    }

    #[test]
    fn test_upsert_returns_the_stored_snapshot() {
        let store = MessageStore::new();
        let at = SystemTime::now();
        let stored = store.upsert("GPS_RAW_INT", json!({"fix_type": 3}), 1.0, at);

        assert_eq!(stored.message, "GPS_RAW_INT");
        assert_eq!(stored.requested_rate_hz, 1.0);
        assert_eq!(stored.received_at, at);
        assert_eq!(
            store.get("GPS_RAW_INT").expect("value present").payload,
            stored.payload
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let store = MessageStore::new();
        store.upsert("VFR_HUD", json!(1), 1.0, SystemTime::now());
        store.upsert("ATTITUDE", json!(2), 1.0, SystemTime::now());
        store.upsert("HEARTBEAT", json!(3), 1.0, SystemTime::now());

        assert_eq!(store.names(), vec!["ATTITUDE", "HEARTBEAT", "VFR_HUD"]);
    }
}
