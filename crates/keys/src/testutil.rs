//! Shared test utilities for crates that depend on `paykey-keys`.
//!
//! Enable the `testutil` feature to use these from another crate's tests.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::{
    clock::Clock,
    document::{KeyDocument, RawKeyEntry},
};

/// First `ECv2` key of [`scenario_document`].
pub const K1: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEPYnHwS8uegWAewQtlxizmLFynwHcxRT1PK07cDA6/C4sXrVI1SzZCUx8U8S0LjMrT6uw/Rk4r6lyN+hUClCj6Q==";

/// Second `ECv2` key of [`scenario_document`].
pub const K2: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAESlVga3aBjJeirbjDztnk7/oFEBsmMTxHUl1oc36JlJ+qtcDL1uHs9wINGCMuOURPWmVwe4aRnKeyvcjT3un0/w==";

/// The `ECv1` key of [`scenario_document`].
pub const K3: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEb3qFkJumsbzH0t3o8/4JFB8qNUBLVmFsd4KNmKOuucTP2uXw+wYRHCcyPUhTXml0f4qVoKu2wczX4u34Aw4ZJA==";

/// Expiration of `K2` in [`scenario_document`], in epoch milliseconds.
pub const K2_EXPIRATION_MILLIS: i64 = 2_154_841_200_000;

/// A key document as published, string-encoded expirations included.
///
/// The second and third values are not canonical base64 (non-zero trailing
/// bits), which real documents are allowed to contain.
pub const PUBLISHED_DOCUMENT: &str = r#"{
  "keys": [
    {
      "keyValue": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEPYnHwS8uegWAewQtlxizmLFynwHcxRT1PK07cDA6/C4sXrVI1SzZCUx8U8S0LjMrT6uw/Rk4r6lyN+hUClCj6Q==",
      "protocolVersion": "ECv2",
      "keyExpiration": "2893456000000"
    },
    {
      "keyValue": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEZqRnRJP5J9zKjx7RYN0QQKqFNdU7yP8VXNjPKV8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J==",
      "protocolVersion":  "ECv2",
      "keyExpiration": "2893456000000"
    },
    {
      "keyValue": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAELGvXMEJJz1J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8J8==",
      "protocolVersion":  "ECv1",
      "keyExpiration":  "2893456000000"
    }
  ]
}"#;

/// A [`Clock`] whose time only moves when told to.
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Creates a clock frozen at `at`.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: std::time::Duration) {
        let by = chrono::Duration::from_std(by).expect("advance duration out of range");
        *self.now.lock() += by;
    }

    /// Sets the clock to `at`, which may be in the past.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Default for MockClock {
    /// Frozen at 2026-01-01T00:00:00Z.
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid date"))
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Builds key document JSON for tests.
#[derive(Debug, Default, Clone)]
pub struct KeyDocumentBuilder {
    keys: Vec<RawKeyEntry>,
}

impl KeyDocumentBuilder {
    /// Starts an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key that expires at `expiration` (`None` omits the field).
    #[must_use]
    pub fn key(
        mut self,
        value: impl Into<String>,
        protocol_version: impl Into<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        self.keys.push(RawKeyEntry {
            key_value: value.into(),
            protocol_version: protocol_version.into(),
            key_expiration: expiration.map(|at| at.timestamp_millis()),
        });
        self
    }

    /// Appends a key with no expiration.
    #[must_use]
    pub fn never_expiring(self, value: impl Into<String>, protocol_version: impl Into<String>) -> Self {
        self.key(value, protocol_version, None)
    }

    /// Returns the document model.
    #[must_use]
    pub fn document(self) -> KeyDocument {
        KeyDocument { keys: self.keys }
    }

    /// Returns the encoded JSON document.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.document().to_vec().expect("key document encodes")
    }
}

/// Two `ECv2` keys (`K1`, `K2`) followed by one `ECv1` key (`K3`).
///
/// `K2` expires in 2038 and the others never expire.
#[must_use]
pub fn scenario_document() -> Vec<u8> {
    KeyDocument {
        keys: vec![
            RawKeyEntry {
                key_value: K1.to_owned(),
                protocol_version: "ECv2".to_owned(),
                key_expiration: None,
            },
            RawKeyEntry {
                key_value: K2.to_owned(),
                protocol_version: "ECv2".to_owned(),
                key_expiration: Some(K2_EXPIRATION_MILLIS),
            },
            RawKeyEntry {
                key_value: K3.to_owned(),
                protocol_version: "ECv1".to_owned(),
                key_expiration: Some(0),
            },
        ],
    }
    .to_vec()
    .expect("scenario document encodes")
}

/// Deterministic, valid base64 key value derived from `seed`.
#[must_use]
pub fn test_key_value(seed: u8) -> String {
    let bytes: Vec<u8> = (0..91u8).map(|i| i.wrapping_mul(31).wrapping_add(seed)).collect();
    STANDARD.encode(bytes)
}
