//! Immutable, indexed view of one key set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::signing_key::SigningKey;

/// Key values grouped by protocol version, captured at one instant.
///
/// A snapshot is rebuilt wholesale on every successful refresh and shared as
/// `Arc<KeySnapshot>`; readers holding an old snapshot keep it alive until
/// they drop it.
///
/// Within one protocol version, key values keep document order and
/// duplicates are preserved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySnapshot {
    by_protocol_version: HashMap<String, Vec<String>>,
    captured_at: DateTime<Utc>,
}

impl KeySnapshot {
    /// Groups `keys` by protocol version, preserving order.
    pub fn from_keys(keys: impl IntoIterator<Item = SigningKey>, captured_at: DateTime<Utc>) -> Self {
        let mut by_protocol_version: HashMap<String, Vec<String>> = HashMap::new();
        for key in keys {
            let version = key.protocol_version().to_owned();
            by_protocol_version.entry(version).or_default().push(key.into_value());
        }
        Self { by_protocol_version, captured_at }
    }

    /// A snapshot with no keys.
    #[must_use]
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self { by_protocol_version: HashMap::new(), captured_at }
    }

    /// Key values for `protocol_version`, or `None` if the set has none.
    #[must_use]
    pub fn keys_for(&self, protocol_version: &str) -> Option<&[String]> {
        self.by_protocol_version.get(protocol_version).map(Vec::as_slice)
    }

    /// Protocol versions present in this snapshot, sorted.
    #[must_use]
    pub fn protocol_versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.by_protocol_version.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    /// Total number of key values across all protocol versions.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.by_protocol_version.values().map(Vec::len).sum()
    }

    /// Returns `true` if the snapshot holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_protocol_version.is_empty()
    }

    /// When the snapshot was built.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
