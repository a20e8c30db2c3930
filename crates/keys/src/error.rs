//! Key retrieval error types and result alias.
//!
//! Every failure that can occur while obtaining a signing key set is mapped to
//! one of these variants, regardless of which transport or decoder produced it.
//!
//! # Error Types
//!
//! - [`KeyError::TransportFailure`] - The key endpoint could not be reached or answered with a
//!   non-success status
//! - [`KeyError::KeyDocumentMalformed`] - The key document could not be decoded or an entry is
//!   missing required fields
//! - [`KeyError::Timeout`] - The transport gave up waiting for a response
//! - [`KeyError::Internal`] - Anything else (a refresh task that panicked, for instance)
//!
//! A protocol version that is simply absent from the key set is *not* an
//! error; lookups return `None` for it.
//!
//! # Example
//!
//! ```
//! use paykey_keys::{KeyError, KeyResult};
//!
//! fn decode(body: &[u8]) -> KeyResult<()> {
//!     if body.is_empty() {
//!         return Err(KeyError::malformed("empty key document"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(decode(b"").is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A shareable error type for source chain tracking.
///
/// `Arc` rather than `Box` so that [`KeyError`] stays `Clone`: one failed
/// refresh is delivered to every caller that joined it.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for key retrieval operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors that can occur while fetching or parsing a signing key set.
///
/// Errors preserve their source chain via the `#[source]` attribute.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The network or HTTP layer failed.
    ///
    /// Covers DNS and connection failures as well as non-success HTTP status
    /// codes from the key endpoint.
    #[error("Transport failure: {message}")]
    TransportFailure {
        /// Description of the transport failure.
        message: String,
        /// The underlying error that caused this failure.
        #[source]
        source: Option<BoxError>,
    },

    /// The key document could not be decoded or failed validation.
    ///
    /// A malformed document never produces a partial key set.
    #[error("Key document malformed: {message}")]
    KeyDocumentMalformed {
        /// Description of what was wrong with the document.
        message: String,
        /// The underlying decode error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The transport gave up waiting for a response.
    #[error("Key fetch timed out")]
    Timeout,

    /// Internal error not attributable to the transport or the document.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },
}

impl KeyError {
    /// Creates a new `TransportFailure` error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure { message: message.into(), source: None }
    }

    /// Creates a new `TransportFailure` error with a message and source error.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TransportFailure { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `KeyDocumentMalformed` error with the given message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::KeyDocumentMalformed { message: message.into(), source: None }
    }

    /// Creates a new `KeyDocumentMalformed` error with a message and source error.
    #[must_use]
    pub fn malformed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::KeyDocumentMalformed { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns `true` for failures that may succeed on a later attempt
    /// (transport failures and timeouts).
    ///
    /// A malformed document is a definitive answer from the endpoint and is
    /// not considered transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportFailure { .. } | Self::Timeout)
    }
}
