//! Counters for cache hits and refresh attempts.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use paykey_provider::RefreshMetrics;
//!
//! let metrics = RefreshMetrics::new();
//! metrics.record_fetch_started();
//! metrics.record_refresh_success(Duration::from_millis(40), 0);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.refresh_successes, 1);
//! assert_eq!(snapshot.mean_refresh_latency(), Duration::from_millis(40));
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct RefreshMetricsSnapshot {
    /// Calls served from a fresh snapshot without a fetch.
    #[builder(default)]
    pub cache_hits: u64,
    /// Fetches actually started.
    #[builder(default)]
    pub fetches_started: u64,
    /// Calls that joined a fetch already in flight.
    #[builder(default)]
    pub joined_waiters: u64,
    /// Refresh attempts that committed a new snapshot.
    #[builder(default)]
    pub refresh_successes: u64,
    /// Refresh attempts that failed.
    #[builder(default)]
    pub refresh_failures: u64,
    /// Cumulative refresh latency in microseconds.
    #[builder(default)]
    pub refresh_latency_us: u64,
    /// Well-formed keys dropped because they had expired.
    #[builder(default)]
    pub keys_discarded_expired: u64,
}

impl RefreshMetricsSnapshot {
    /// Fraction of completed refreshes that succeeded (1.0 when none ran).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.refresh_successes + self.refresh_failures;
        if total == 0 { 1.0 } else { self.refresh_successes as f64 / total as f64 }
    }

    /// Mean latency of completed refreshes.
    #[must_use]
    pub fn mean_refresh_latency(&self) -> Duration {
        let total = self.refresh_successes + self.refresh_failures;
        if total == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.refresh_latency_us / total)
        }
    }
}

struct RefreshMetricsInner {
    cache_hits: AtomicU64,
    fetches_started: AtomicU64,
    joined_waiters: AtomicU64,
    refresh_successes: AtomicU64,
    refresh_failures: AtomicU64,
    refresh_latency_us: AtomicU64,
    keys_discarded_expired: AtomicU64,
}

/// Thread-safe refresh counters.
///
/// Cloning is cheap and clones share the same counters.
#[derive(Clone)]
pub struct RefreshMetrics {
    inner: Arc<RefreshMetricsInner>,
}

impl RefreshMetrics {
    /// Creates a collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RefreshMetricsInner {
                cache_hits: AtomicU64::new(0),
                fetches_started: AtomicU64::new(0),
                joined_waiters: AtomicU64::new(0),
                refresh_successes: AtomicU64::new(0),
                refresh_failures: AtomicU64::new(0),
                refresh_latency_us: AtomicU64::new(0),
                keys_discarded_expired: AtomicU64::new(0),
            }),
        }
    }

    /// Records a call served from cache.
    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the start of a fetch.
    pub fn record_fetch_started(&self) {
        self.inner.fetches_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a call that joined an in-flight fetch.
    pub fn record_joined_waiter(&self) {
        self.inner.joined_waiters.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a committed refresh.
    pub fn record_refresh_success(&self, duration: Duration, discarded_expired: usize) {
        self.inner.refresh_successes.fetch_add(1, Ordering::Relaxed);
        self.inner.refresh_latency_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.inner.keys_discarded_expired.fetch_add(discarded_expired as u64, Ordering::Relaxed);
    }

    /// Records a failed refresh.
    pub fn record_refresh_failure(&self, duration: Duration) {
        self.inner.refresh_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.refresh_latency_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> RefreshMetricsSnapshot {
        RefreshMetricsSnapshot {
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            fetches_started: self.inner.fetches_started.load(Ordering::Relaxed),
            joined_waiters: self.inner.joined_waiters.load(Ordering::Relaxed),
            refresh_successes: self.inner.refresh_successes.load(Ordering::Relaxed),
            refresh_failures: self.inner.refresh_failures.load(Ordering::Relaxed),
            refresh_latency_us: self.inner.refresh_latency_us.load(Ordering::Relaxed),
            keys_discarded_expired: self.inner.keys_discarded_expired.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters at info level. Called after every refresh
    /// attempt.
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            cache_hits = snapshot.cache_hits,
            fetches_started = snapshot.fetches_started,
            joined_waiters = snapshot.joined_waiters,
            refresh_successes = snapshot.refresh_successes,
            refresh_failures = snapshot.refresh_failures,
            mean_refresh_ms = snapshot.mean_refresh_latency().as_millis() as u64,
            keys_discarded_expired = snapshot.keys_discarded_expired,
            "key provider metrics"
        );
    }
}

impl Default for RefreshMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RefreshMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshMetrics").field("snapshot", &self.snapshot()).finish()
    }
}
