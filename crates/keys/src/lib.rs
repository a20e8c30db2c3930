//! # Paykey Keys
//!
//! Data model and parsing for payment-message signing keys.
//!
//! This crate provides:
//! - **Key document decoding**: the `{"keys": [...]}` JSON published by the key endpoint
//! - **Validation**: required fields, expiration resolution
//! - **Expiration filtering**: expired keys are dropped at parse time
//! - **Snapshots**: immutable key sets indexed by protocol version
//!
//! No I/O happens here; fetching and caching live in `paykey-provider`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use paykey_keys::{KeyParser, SystemClock};
//!
//! let parser = KeyParser::new(Arc::new(SystemClock));
//! let snapshot = parser
//!     .parse(br#"{"keys":[{"keyValue":"AAAA","protocolVersion":"ECv2"}]}"#)
//!     .unwrap();
//!
//! assert_eq!(snapshot.keys_for("ECv2").unwrap(), ["AAAA"]);
//! assert!(snapshot.keys_for("ECv1").is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Time source abstraction.
pub mod clock;
/// Raw key document wire types.
pub mod document;
/// Key error types.
pub mod error;
/// Document parsing and expiration filtering.
pub mod parser;
/// Validated signing key.
pub mod signing_key;
/// Immutable key set snapshot.
pub mod snapshot;
/// Shared test helpers.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

pub use clock::{Clock, SystemClock};
pub use document::{KeyDocument, RawKeyEntry};
pub use error::{BoxError, KeyError, KeyResult};
pub use parser::{KeyParser, ParseReport};
pub use signing_key::SigningKey;
pub use snapshot::KeySnapshot;
