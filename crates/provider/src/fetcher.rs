//! One retrieval of the key document plus its freshness hint.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use fail::fail_point;
use paykey_keys::{KeyError, KeyResult};

use crate::transport::KeyTransport;

/// Raw document and the `max-age` hint that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Undecoded key document.
    pub body: Bytes,
    /// Freshness hint from `Cache-Control`, if present, valid, and honored.
    pub max_age: Option<Duration>,
}

/// Retrieves the key document from one configured URL.
///
/// Each call to [`KeyFetcher::fetch`] issues exactly one transport request.
/// Failures are returned as-is; retrying is up to the caller.
#[derive(Clone)]
pub struct KeyFetcher {
    transport: Arc<dyn KeyTransport>,
    url: String,
    honor_cache_control: bool,
}

impl KeyFetcher {
    /// Creates a fetcher for `url`.
    ///
    /// With `honor_cache_control` unset the response's `Cache-Control` header
    /// is ignored and [`FetchedDocument::max_age`] is always `None`.
    pub fn new(transport: Arc<dyn KeyTransport>, url: impl Into<String>, honor_cache_control: bool) -> Self {
        Self { transport, url: url.into(), honor_cache_control }
    }

    /// The URL this fetcher retrieves.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs one retrieval.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::TransportFailure`] for network failures and
    /// non-2xx statuses, and [`KeyError::Timeout`] if the transport timed out.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> KeyResult<FetchedDocument> {
        fail_point!("fetcher-before-request", |_| {
            Err(KeyError::transport("injected failure before request"))
        });

        let response = self.transport.get(&self.url).await?;
        if !response.is_success() {
            return Err(KeyError::transport(format!(
                "GET {} returned status {}",
                self.url,
                response.status()
            )));
        }

        let max_age = match response.header("cache-control") {
            Some(value) if self.honor_cache_control => {
                let parsed = parse_max_age(value);
                if parsed.is_none() && value.to_ascii_lowercase().contains("max-age") {
                    tracing::warn!(cache_control = value, "ignoring unusable max-age directive");
                }
                parsed
            },
            _ => None,
        };

        Ok(FetchedDocument { body: response.into_body(), max_age })
    }
}

impl std::fmt::Debug for KeyFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFetcher")
            .field("url", &self.url)
            .field("honor_cache_control", &self.honor_cache_control)
            .finish_non_exhaustive()
    }
}

/// Extracts the `max-age` directive from a `Cache-Control` header value.
///
/// Directives are comma separated and matched case-insensitively. The first
/// `max-age` directive decides: a non-negative integer number of seconds,
/// optionally quoted, yields `Some`; anything else yields `None` without
/// looking further.
///
/// ```
/// use std::time::Duration;
/// use paykey_provider::parse_max_age;
///
/// assert_eq!(parse_max_age("public, max-age=3600"), Some(Duration::from_secs(3600)));
/// assert_eq!(parse_max_age("no-store"), None);
/// assert_eq!(parse_max_age("max-age=soon, max-age=60"), None);
/// ```
#[must_use]
pub fn parse_max_age(header_value: &str) -> Option<Duration> {
    for directive in header_value.split(',') {
        let (name, value) = match directive.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (directive.trim(), None),
        };
        if !name.eq_ignore_ascii_case("max-age") {
            continue;
        }

        let value = value?;
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }
    None
}
