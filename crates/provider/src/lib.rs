//! # Paykey Provider
//!
//! Cached access to the signing keys that verify signed payment messages.
//!
//! This crate provides:
//! - **[`KeyProvider`]**: `get_public_keys` / `prefetch_keys` facade
//! - **Single-flight refresh**: concurrent callers share one in-flight fetch
//! - **Freshness window**: 7 days by default, overridable by `Cache-Control: max-age`
//! - **Transport seam**: [`KeyTransport`] with a `reqwest`-backed [`HttpTransport`]
//!
//! Refreshes happen on the calling path; there is no background polling. A
//! failed refresh is reported to every caller that waited on it and the
//! previously cached keys, if any, are kept.
//!
//! ## Example
//!
//! ```no_run
//! use paykey_provider::{KeyProvider, ProviderConfig};
//!
//! # async fn example() -> Result<(), paykey_provider::ProviderError> {
//! let provider = KeyProvider::new(ProviderConfig::default())?;
//! provider.prefetch_keys().await?;
//!
//! match provider.get_public_keys("ECv2").await? {
//!     Some(keys) => println!("{} keys", keys.len()),
//!     None => println!("no ECv2 keys published"),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Guarded cache state and freshness window.
pub mod cache;
/// Provider configuration.
pub mod config;
/// Single-flight refresh coordination.
pub mod coordinator;
/// Provider error types.
pub mod error;
/// Key document retrieval and `max-age` parsing.
pub mod fetcher;
/// Refresh counters.
pub mod metrics;
/// Public provider facade.
pub mod provider;
/// Shared test helpers.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
/// Transport abstraction and HTTP implementation.
pub mod transport;

pub use cache::{DEFAULT_FRESHNESS, FreshnessWindow, KeyCache, WindowSource};
pub use config::{KeyEnvironment, PRODUCTION_KEYS_URL, ProviderConfig, TEST_KEYS_URL};
pub use coordinator::RefreshCoordinator;
pub use error::{ProviderError, Result};
pub use fetcher::{FetchedDocument, KeyFetcher, parse_max_age};
pub use metrics::{RefreshMetrics, RefreshMetricsSnapshot};
pub use provider::{KeyProvider, SignatureKeyProvider};
pub use transport::{HttpTransport, KeyTransport, TransportResponse};
