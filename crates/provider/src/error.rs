//! Provider error types.
//!
//! [`ProviderError`] is what callers of [`KeyProvider`](crate::KeyProvider)
//! see. Refresh failures wrap the underlying [`KeyError`] so the transport or
//! document failure stays reachable through the source chain.
//!
//! A protocol version with no published keys is not an error:
//! [`KeyProvider::get_public_keys`](crate::KeyProvider::get_public_keys)
//! returns `Ok(None)`.

use paykey_keys::KeyError;
use thiserror::Error;

use crate::transport::map_reqwest_error;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors returned by the key provider.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// A refresh attempt failed.
    ///
    /// Every caller that joined the attempt receives a clone of the same
    /// error. The previously cached key set, if any, is unaffected.
    #[error("Key refresh failed: {0}")]
    Refresh(#[source] KeyError),

    /// Invalid provider configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the underlying key error for refresh failures.
    #[must_use]
    pub fn key_error(&self) -> Option<&KeyError> {
        match self {
            Self::Refresh(err) => Some(err),
            Self::Config(_) => None,
        }
    }

    /// Returns `true` if a later attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.key_error().is_some_and(KeyError::is_transient)
    }
}

impl From<KeyError> for ProviderError {
    fn from(err: KeyError) -> Self {
        Self::Refresh(err)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Refresh(map_reqwest_error("HTTP client error", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProviderError::from(KeyError::timeout()).to_string(),
            "Key refresh failed: Key fetch timed out"
        );
        assert_eq!(
            ProviderError::config("url cannot be empty").to_string(),
            "Invalid configuration: url cannot be empty"
        );
    }

    #[test]
    fn test_refresh_source_is_key_error() {
        let err = ProviderError::from(KeyError::malformed("missing field `keys`"));

        let source = err.source().expect("refresh error must have a source");
        assert_eq!(source.to_string(), "Key document malformed: missing field `keys`");
        assert!(matches!(err.key_error(), Some(KeyError::KeyDocumentMalformed { .. })));
    }

    #[test]
    fn test_is_transient() {
        assert!(ProviderError::from(KeyError::transport("503")).is_transient());
        assert!(!ProviderError::from(KeyError::malformed("bad")).is_transient());
        assert!(!ProviderError::config("bad").is_transient());
    }
}
