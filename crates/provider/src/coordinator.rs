//! Single-flight refresh of the key cache.
//!
//! [`RefreshCoordinator::ensure_fresh`] either returns the cached snapshot or
//! waits on the one refresh that is allowed to be in flight. The refresh runs
//! as a spawned Tokio task whose result is broadcast through a shared future,
//! so it completes even if every caller that was waiting on it goes away, and
//! every caller that joined it sees the same outcome.

use std::{sync::Arc, time::Instant};

use futures::FutureExt;
use paykey_keys::{KeyError, KeyParser, KeyResult, KeySnapshot};
use tracing::Instrument;

use crate::{
    cache::{KeyCache, SharedRefresh},
    fetcher::KeyFetcher,
    metrics::RefreshMetrics,
};

/// Guarantees at most one outstanding fetch per [`KeyCache`].
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    cache: Arc<KeyCache>,
    fetcher: KeyFetcher,
    parser: KeyParser,
    metrics: RefreshMetrics,
}

impl RefreshCoordinator {
    /// Creates a coordinator refreshing `cache` through `fetcher`.
    ///
    /// The parser evaluates key expiration against the cache's clock.
    pub fn new(cache: Arc<KeyCache>, fetcher: KeyFetcher, metrics: RefreshMetrics) -> Self {
        let parser = KeyParser::new(Arc::clone(cache.clock()));
        Self { cache, fetcher, parser, metrics }
    }

    /// The cache this coordinator refreshes.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Returns a fresh snapshot, refreshing first if needed.
    ///
    /// - Fresh: returns the cached snapshot without touching the network.
    /// - Stale with no refresh running: starts one and waits for it.
    /// - Stale with a refresh running: waits for that refresh.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the refresh's [`KeyError`]. Every caller that waited on the
    /// failed attempt gets a clone of the same error; the previous snapshot
    /// stays in the cache and the next call starts a new attempt.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_fresh(&self) -> KeyResult<Arc<KeySnapshot>> {
        let handle = {
            let now = self.cache.clock().now();
            let mut state = self.cache.lock();

            if let Some(snapshot) = state.fresh_snapshot(now) {
                self.metrics.record_cache_hit();
                tracing::debug!(cache = "hit", "serving cached key set");
                return Ok(snapshot);
            }

            match state.in_flight() {
                Some(handle) => {
                    self.metrics.record_joined_waiter();
                    tracing::debug!(cache = "miss", "joining in-flight refresh");
                    handle
                },
                None => {
                    tracing::debug!(cache = "miss", "starting refresh");
                    let handle = self.spawn_refresh(state.generation());
                    state.set_in_flight(handle.clone());
                    handle
                },
            }
        };

        handle.await
    }

    /// Spawns the refresh task. Called with the cache lock held; the task
    /// cannot clear the in-flight slot before the caller has filled it.
    fn spawn_refresh(&self, generation: u64) -> SharedRefresh {
        self.metrics.record_fetch_started();

        let task = tokio::spawn(
            run_refresh(
                Arc::clone(&self.cache),
                self.fetcher.clone(),
                self.parser.clone(),
                self.metrics.clone(),
                generation,
            )
            .instrument(tracing::info_span!("refresh", url = self.fetcher.url())),
        );

        let cache = Arc::clone(&self.cache);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    // The task never reached its own cleanup.
                    cache.lock().clear_in_flight();
                    tracing::error!(error = %join_err, "key refresh task failed");
                    Err(KeyError::internal_with_source("key refresh task failed", join_err))
                },
            }
        }
        .boxed()
        .shared()
    }
}

/// Fetches, parses, and commits one key set.
///
/// Clears the in-flight slot and commits under the same lock acquisition,
/// so no caller can observe a cleared slot together with the old snapshot.
async fn run_refresh(
    cache: Arc<KeyCache>,
    fetcher: KeyFetcher,
    parser: KeyParser,
    metrics: RefreshMetrics,
    generation: u64,
) -> KeyResult<Arc<KeySnapshot>> {
    let started = Instant::now();
    let outcome = async {
        let fetched = fetcher.fetch().await?;
        let report = parser.parse_report(&fetched.body)?;
        Ok::<_, KeyError>((report, fetched.max_age))
    }
    .await;
    let elapsed = started.elapsed();
    let fetch_ms = elapsed.as_millis() as u64;

    match outcome {
        Ok((report, max_age)) => {
            let snapshot = Arc::new(report.snapshot);
            let marked_fresh = {
                let now = cache.clock().now();
                let mut state = cache.lock();
                state.clear_in_flight();
                state.commit(now, Arc::clone(&snapshot), max_age, generation)
            };

            metrics.record_refresh_success(elapsed, report.discarded_expired);
            tracing::info!(
                fetch_ms,
                key_count = snapshot.key_count(),
                discarded_expired = report.discarded_expired,
                max_age_secs = max_age.map(|d| d.as_secs()),
                "key set refreshed"
            );
            if !marked_fresh {
                tracing::debug!("cache invalidated during refresh, snapshot left stale");
            }
            metrics.log_metrics();
            Ok(snapshot)
        },
        Err(err) => {
            cache.lock().clear_in_flight();
            metrics.record_refresh_failure(elapsed);
            tracing::warn!(error = %err, fetch_ms, "key refresh failed");
            metrics.log_metrics();
            Err(err)
        },
    }
}
