//! Public facade over the cache and refresh coordinator.

use std::sync::Arc;

use async_trait::async_trait;
use paykey_keys::{Clock, KeySnapshot, SystemClock};

use crate::{
    cache::{FreshnessWindow, KeyCache},
    config::{KeyEnvironment, ProviderConfig},
    coordinator::RefreshCoordinator,
    error::Result,
    fetcher::KeyFetcher,
    metrics::{RefreshMetrics, RefreshMetricsSnapshot},
    transport::{HttpTransport, KeyTransport},
};

/// Source of public keys for verifying signed payment messages.
///
/// Verification code should depend on this trait rather than on
/// [`KeyProvider`] directly.
#[async_trait]
pub trait SignatureKeyProvider: Send + Sync {
    /// Returns the base64 key values published for `protocol_version`, in
    /// document order, or `None` if there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys had to be refreshed and the refresh
    /// failed.
    async fn get_public_keys(&self, protocol_version: &str) -> Result<Option<Vec<String>>>;
}

/// Cached, single-flight provider of payment-message signing keys.
///
/// Keys are fetched on demand: the first call (and the first call after the
/// freshness window lapses) fetches the key document; every other call is
/// answered from memory. Concurrent callers arriving while a fetch is running
/// wait for that fetch instead of starting their own.
///
/// Cloning is cheap; clones share one cache.
///
/// # Example
///
/// ```no_run
/// use paykey_provider::{KeyEnvironment, KeyProvider};
///
/// # async fn example() -> Result<(), paykey_provider::ProviderError> {
/// let provider = KeyProvider::for_environment(KeyEnvironment::Test)?;
///
/// if let Some(keys) = provider.get_public_keys("ECv2").await? {
///     println!("{} ECv2 keys", keys.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KeyProvider {
    config: Arc<ProviderConfig>,
    coordinator: RefreshCoordinator,
    metrics: RefreshMetrics,
}

impl KeyProvider {
    /// Creates an HTTP-backed provider using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`](crate::ProviderError::Config) if
    /// `config` is invalid, or a refresh error if the HTTP client cannot be
    /// built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(SystemClock))
    }

    /// Creates an HTTP-backed provider for the built-in endpoint of
    /// `environment`.
    ///
    /// # Errors
    ///
    /// Same as [`KeyProvider::new`].
    pub fn for_environment(environment: KeyEnvironment) -> Result<Self> {
        Self::new(ProviderConfig::for_environment(environment))
    }

    /// Creates a provider over an arbitrary transport and clock.
    ///
    /// The transport's own timeouts apply; `config`'s timeouts are only used
    /// by [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`](crate::ProviderError::Config) if
    /// `config` is invalid.
    pub fn with_transport(
        config: ProviderConfig,
        transport: Arc<dyn KeyTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = RefreshMetrics::new();
        let cache = Arc::new(KeyCache::new(clock, config.default_freshness()));
        let fetcher =
            KeyFetcher::new(transport, config.source_url(), config.honor_cache_control());
        let coordinator = RefreshCoordinator::new(cache, fetcher, metrics.clone());

        tracing::debug!(
            url = config.source_url(),
            default_freshness_secs = config.default_freshness().as_secs(),
            honor_cache_control = config.honor_cache_control(),
            "key provider created"
        );

        Ok(Self { config: Arc::new(config), coordinator, metrics })
    }

    /// Returns the keys for `protocol_version`, refreshing first if the
    /// cached set is stale.
    ///
    /// `Ok(None)` means the current key set has no keys for that version;
    /// it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Refresh`](crate::ProviderError::Refresh) if a
    /// refresh was needed and failed.
    #[tracing::instrument(skip(self))]
    pub async fn get_public_keys(&self, protocol_version: &str) -> Result<Option<Vec<String>>> {
        let snapshot = self.coordinator.ensure_fresh().await?;
        let keys = snapshot.keys_for(protocol_version).map(<[String]>::to_vec);
        if keys.is_none() {
            tracing::debug!(protocol_version, "no keys for protocol version");
        }
        Ok(keys)
    }

    /// Makes sure a fresh key set is cached, fetching it if needed.
    ///
    /// # Errors
    ///
    /// Same as [`KeyProvider::get_public_keys`].
    #[tracing::instrument(skip(self))]
    pub async fn prefetch_keys(&self) -> Result<()> {
        self.coordinator.ensure_fresh().await?;
        Ok(())
    }

    /// Marks the cached key set stale so the next call fetches again.
    pub fn invalidate(&self) {
        self.coordinator.cache().invalidate();
    }

    /// The freshness window currently in effect.
    #[must_use]
    pub fn freshness_window(&self) -> FreshnessWindow {
        self.coordinator.cache().freshness_window()
    }

    /// The cached key set, fresh or not, without refreshing.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KeySnapshot>> {
        self.coordinator.cache().read_snapshot()
    }

    /// Current refresh counters.
    #[must_use]
    pub fn metrics(&self) -> RefreshMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The provider's configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl SignatureKeyProvider for KeyProvider {
    async fn get_public_keys(&self, protocol_version: &str) -> Result<Option<Vec<String>>> {
        KeyProvider::get_public_keys(self, protocol_version).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use paykey_keys::{
        KeyError,
        testutil::{K1, K2, K3, MockClock, scenario_document},
    };

    use super::*;
    use crate::{
        ProviderError,
        cache::WindowSource,
        config::TEST_KEYS_URL,
        testutil::{StaticTransport, provider_with},
        transport::TransportResponse,
    };

    fn provider(transport: Arc<StaticTransport>) -> (KeyProvider, Arc<MockClock>) {
        let clock = Arc::new(MockClock::default());
        (provider_with(transport, Arc::clone(&clock) as Arc<dyn Clock>), clock)
    }

    #[tokio::test]
    async fn test_scenario_lookups() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let (provider, _) = provider(transport.clone());

        assert_eq!(provider.get_public_keys("ECv2").await.unwrap(), Some(vec![K1.to_owned(), K2.to_owned()]));
        assert_eq!(provider.get_public_keys("ECv1").await.unwrap(), Some(vec![K3.to_owned()]));
        assert_eq!(provider.get_public_keys("ECv99").await.unwrap(), None);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_prefetch_then_lookup_needs_no_fetch() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let (provider, _) = provider(transport.clone());

        provider.prefetch_keys().await.unwrap();
        assert_eq!(transport.call_count(), 1);
        assert!(provider.snapshot().is_some());

        provider.get_public_keys("ECv2").await.unwrap();
        assert_eq!(transport.call_count(), 1);
        assert_eq!(provider.metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let transport = Arc::new(StaticTransport::failing(KeyError::transport("dns failure")));
        let (provider, _) = provider(transport);

        let err = provider.get_public_keys("ECv2").await.unwrap_err();
        assert!(matches!(err, ProviderError::Refresh(KeyError::TransportFailure { .. })));
        assert!(provider.prefetch_keys().await.is_err());
        assert!(provider.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_stale_snapshot_survives_failed_refresh() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let (provider, clock) = provider(transport.clone());
        provider.prefetch_keys().await.unwrap();

        clock.advance(Duration::from_secs(8 * 24 * 3600));
        transport.set_response(Ok(TransportResponse::new(500, "")));

        assert!(provider.get_public_keys("ECv2").await.is_err());
        assert_eq!(provider.snapshot().unwrap().keys_for("ECv2").unwrap(), [K1, K2]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let (provider, _) = provider(transport.clone());
        provider.prefetch_keys().await.unwrap();

        provider.invalidate();
        assert!(provider.snapshot().is_some());
        provider.prefetch_keys().await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_window_reflects_server_hint() {
        let transport = Arc::new(StaticTransport::new(
            TransportResponse::new(200, scenario_document()).with_header("cache-control", "max-age=120"),
        ));
        let (provider, _) = provider(transport);

        assert_eq!(provider.freshness_window().source(), WindowSource::Default);
        provider.prefetch_keys().await.unwrap();

        let window = provider.freshness_window();
        assert_eq!(window.source(), WindowSource::ServerHint);
        assert_eq!(window.duration(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_hint_ignored_when_disabled() {
        let transport = Arc::new(StaticTransport::new(
            TransportResponse::new(200, scenario_document()).with_header("cache-control", "max-age=120"),
        ));
        let config = ProviderConfig::builder().honor_cache_control(false).build().unwrap();
        let provider =
            KeyProvider::with_transport(config, transport, Arc::new(MockClock::default())).unwrap();

        provider.prefetch_keys().await.unwrap();
        assert_eq!(provider.freshness_window().source(), WindowSource::Default);
    }

    #[tokio::test]
    async fn test_requests_configured_url() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let provider = KeyProvider::with_transport(
            ProviderConfig::for_environment(KeyEnvironment::Test),
            transport.clone(),
            Arc::new(MockClock::default()),
        )
        .unwrap();

        provider.prefetch_keys().await.unwrap();
        assert_eq!(transport.requested_urls(), [TEST_KEYS_URL]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: ProviderConfig = serde_json::from_str(r#"{"url": ""}"#).unwrap();
        let result = KeyProvider::with_transport(
            config,
            Arc::new(StaticTransport::ok("{}")),
            Arc::new(MockClock::default()),
        );
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[tokio::test]
    async fn test_usable_through_trait_object() {
        let transport = Arc::new(StaticTransport::ok(scenario_document()));
        let (provider, _) = provider(transport);
        let dynamic: Arc<dyn SignatureKeyProvider> = Arc::new(provider);

        assert_eq!(dynamic.get_public_keys("ECv1").await.unwrap(), Some(vec![K3.to_owned()]));
    }
}
