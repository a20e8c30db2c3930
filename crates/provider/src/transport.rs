//! Transport abstraction for retrieving the key document.
//!
//! [`KeyTransport`] models a single `GET` returning status, headers, and body.
//! [`HttpTransport`] is the production implementation on top of `reqwest`;
//! tests substitute canned or gated transports from `testutil`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use paykey_keys::{KeyError, KeyResult};

use crate::{config::ProviderConfig, error::Result};

/// Response to one transport request.
///
/// Header names are stored lowercased; when a header repeats, only the first
/// value is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl TransportResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HashMap::new(), body: body.into() }
    }

    /// Adds a header unless one with the same name (ignoring case) is present.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.entry(name.to_ascii_lowercase()).or_insert_with(|| value.into());
        self
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the response, returning the body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Performs one retrieval of a URL.
///
/// Implementations report network-level failures as
/// [`KeyError::TransportFailure`] or [`KeyError::Timeout`]. Non-success
/// statuses are returned as responses; the fetcher decides what they mean.
/// No retries happen at this layer.
#[async_trait]
pub trait KeyTransport: Send + Sync {
    /// Issues a `GET` for `url`.
    async fn get(&self, url: &str) -> KeyResult<TransportResponse>;
}

/// [`KeyTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with the connect and request timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Refresh`](crate::ProviderError::Refresh) if
    /// the HTTP client cannot be initialised (TLS backend failure).
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyTransport for HttpTransport {
    async fn get(&self, url: &str) -> KeyResult<TransportResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(format!("GET {url}"), e))?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers.entry(name.as_str().to_owned()).or_insert_with(|| value.to_owned());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(format!("reading body of {url}"), e))?;

        Ok(TransportResponse { status, headers, body })
    }
}

/// Maps a `reqwest` failure onto [`KeyError`].
pub(crate) fn map_reqwest_error(context: impl Into<String>, err: reqwest::Error) -> KeyError {
    if err.is_timeout() {
        return KeyError::timeout();
    }
    let context = context.into();
    KeyError::transport_with_source(format!("{context}: {err}"), err)
}
