//! Configuration for the key provider.
//!
//! [`ProviderConfig`] selects the key endpoint and controls how long a fetched
//! key set is considered fresh.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use paykey_provider::{KeyEnvironment, ProviderConfig};
//!
//! let config = ProviderConfig::builder()
//!     .environment(KeyEnvironment::Test)
//!     .default_freshness(Duration::from_secs(24 * 3600))
//!     .build()?;
//!
//! assert!(config.source_url().contains("/test/"));
//! # Ok::<(), paykey_provider::ProviderError>(())
//! ```

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    cache::DEFAULT_FRESHNESS,
    error::{ProviderError, Result},
};

/// Production key endpoint.
pub const PRODUCTION_KEYS_URL: &str =
    "https://payments.developers.google.com/paymentmethodtoken/keys.json";

/// Test key endpoint.
pub const TEST_KEYS_URL: &str =
    "https://payments.developers.google.com/paymentmethodtoken/test/keys.json";

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default whole-request timeout (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which published key set to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEnvironment {
    /// Keys that sign live payment messages.
    #[default]
    Production,
    /// Keys that sign messages in the test environment.
    Test,
}

impl KeyEnvironment {
    /// The built-in key endpoint for this environment.
    #[must_use]
    pub fn url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_KEYS_URL,
            Self::Test => TEST_KEYS_URL,
        }
    }
}

/// Configuration for [`KeyProvider`](crate::KeyProvider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Built-in endpoint selection.
    #[serde(default)]
    pub(crate) environment: KeyEnvironment,

    /// Explicit endpoint, overriding `environment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<String>,

    /// Freshness window used until the endpoint supplies a `max-age` hint.
    #[serde(with = "humantime_serde", default = "default_freshness")]
    pub(crate) default_freshness: Duration,

    /// Whether a `max-age` hint may replace the freshness window.
    #[serde(default = "default_honor_cache_control")]
    pub(crate) honor_cache_control: bool,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub(crate) connect_timeout: Duration,

    /// Whole-request timeout.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub(crate) request_timeout: Duration,
}

fn default_freshness() -> Duration {
    DEFAULT_FRESHNESS
}

fn default_honor_cache_control() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            environment: KeyEnvironment::default(),
            url: None,
            default_freshness: default_freshness(),
            honor_cache_control: default_honor_cache_control(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[bon::bon]
impl ProviderConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `environment` - Built-in endpoint (default: production).
    /// * `url` - Explicit endpoint; overrides `environment`.
    /// * `default_freshness` - Window before a server hint (default: 7 days).
    /// * `honor_cache_control` - Accept `max-age` hints (default: true).
    /// * `connect_timeout` - Connection timeout (default: 10 seconds).
    /// * `request_timeout` - Whole-request timeout (default: 30 seconds).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if:
    /// - `url` is empty, unparseable, or not `http`/`https`
    /// - `default_freshness` is zero
    /// - either timeout is zero
    #[builder]
    pub fn new(
        #[builder(default)] environment: KeyEnvironment,
        #[builder(into)] url: Option<String>,
        #[builder(default = DEFAULT_FRESHNESS)] default_freshness: Duration,
        #[builder(default = true)] honor_cache_control: bool,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
        #[builder(default = DEFAULT_REQUEST_TIMEOUT)] request_timeout: Duration,
    ) -> Result<Self> {
        let config = Self {
            environment,
            url,
            default_freshness,
            honor_cache_control,
            connect_timeout,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for the built-in endpoint of `environment`, all other
    /// fields at their defaults.
    #[must_use]
    pub fn for_environment(environment: KeyEnvironment) -> Self {
        Self { environment, ..Self::default() }
    }

    /// Checks invariants. Deserialized configs should be validated before use;
    /// provider constructors do this.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ProviderConfig::builder`].
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err(ProviderError::config("url cannot be empty"));
            }
            let parsed = Url::parse(url)
                .map_err(|e| ProviderError::config(format!("invalid url {url:?}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ProviderError::config(format!(
                    "url scheme must be http or https, got {:?}",
                    parsed.scheme()
                )));
            }
        }

        if self.default_freshness.is_zero() {
            return Err(ProviderError::config("default_freshness must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ProviderError::config("connect_timeout must be non-zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(ProviderError::config("request_timeout must be non-zero"));
        }
        Ok(())
    }

    /// Returns the configured environment.
    #[must_use]
    pub fn environment(&self) -> KeyEnvironment {
        self.environment
    }

    /// Returns the endpoint keys are fetched from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        self.url.as_deref().unwrap_or_else(|| self.environment.url())
    }

    /// Returns the default freshness window.
    #[must_use]
    pub fn default_freshness(&self) -> Duration {
        self.default_freshness
    }

    /// Returns whether `max-age` hints are honored.
    #[must_use]
    pub fn honor_cache_control(&self) -> bool {
        self.honor_cache_control
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the whole-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
