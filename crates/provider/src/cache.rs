//! Guarded cache state: current snapshot, freshness window, in-flight refresh.
//!
//! Everything the refresh logic decides on lives in one [`CacheState`]
//! behind a single mutex, so "is the snapshot fresh" and "is a refresh
//! pending" are always answered together. Critical sections are short and
//! never span I/O.
//!
//! # Freshness
//!
//! A snapshot is fresh while `now - last_refreshed_at < window`. The window
//! starts at the configured default and is replaced whenever a refresh
//! carries a `max-age` hint; it then stays at the hinted value until another
//! hint replaces it. A clock that moves backwards leaves the snapshot fresh
//! until it passes `last_refreshed_at + window` again.
//!
//! # Invalidation
//!
//! [`KeyCache::invalidate`] marks the snapshot stale without discarding it.
//! A refresh that was already running when the cache was invalidated still
//! installs its result, but leaves the cache stale so the next caller
//! fetches again.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use paykey_keys::{Clock, KeyResult, KeySnapshot};
use parking_lot::{Mutex, MutexGuard};

/// Default freshness window (7 days).
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Handle shared by every caller waiting on one refresh attempt.
pub(crate) type SharedRefresh = Shared<BoxFuture<'static, KeyResult<Arc<KeySnapshot>>>>;

/// Where the current freshness window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSource {
    /// The configured default.
    Default,
    /// A `max-age` hint from the key endpoint.
    ServerHint,
}

/// How long a snapshot stays fresh after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreshnessWindow {
    duration: Duration,
    source: WindowSource,
}

impl FreshnessWindow {
    /// A window from configuration.
    #[must_use]
    pub fn configured(duration: Duration) -> Self {
        Self { duration, source: WindowSource::Default }
    }

    /// A window from a server `max-age` hint.
    #[must_use]
    pub fn server_hint(duration: Duration) -> Self {
        Self { duration, source: WindowSource::ServerHint }
    }

    /// Window length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Origin of the window.
    #[must_use]
    pub fn source(&self) -> WindowSource {
        self.source
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::configured(DEFAULT_FRESHNESS)
    }
}

/// State guarded by the cache mutex.
///
/// `in_flight` is `Some` exactly while a fetch is outstanding. `snapshot`
/// is `None` only until the first successful refresh.
pub(crate) struct CacheState {
    snapshot: Option<Arc<KeySnapshot>>,
    last_refreshed_at: Option<DateTime<Utc>>,
    window: FreshnessWindow,
    in_flight: Option<SharedRefresh>,
    generation: u64,
}

impl CacheState {
    fn new(window: FreshnessWindow) -> Self {
        Self { snapshot: None, last_refreshed_at: None, window, in_flight: None, generation: 0 }
    }

    pub(crate) fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let (Some(_), Some(last)) = (&self.snapshot, self.last_refreshed_at) else {
            return false;
        };
        match now.signed_duration_since(last).to_std() {
            Ok(elapsed) => elapsed < self.window.duration,
            // Clock went backwards. Stays fresh until `now` passes
            // `last + window`, which can outlast the advertised window.
            Err(_) => true,
        }
    }

    /// The snapshot, if one exists and is fresh at `now`.
    pub(crate) fn fresh_snapshot(&self, now: DateTime<Utc>) -> Option<Arc<KeySnapshot>> {
        if self.is_fresh_at(now) { self.snapshot.clone() } else { None }
    }

    pub(crate) fn snapshot(&self) -> Option<Arc<KeySnapshot>> {
        self.snapshot.clone()
    }

    pub(crate) fn in_flight(&self) -> Option<SharedRefresh> {
        self.in_flight.clone()
    }

    pub(crate) fn set_in_flight(&mut self, handle: SharedRefresh) {
        debug_assert!(self.in_flight.is_none(), "refresh already in flight");
        self.in_flight = Some(handle);
    }

    pub(crate) fn clear_in_flight(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Installs `snapshot` and applies `hint` to the window.
    ///
    /// The snapshot is marked fresh only if no invalidation happened since
    /// `started_generation`. Returns whether it was marked fresh.
    pub(crate) fn commit(
        &mut self,
        now: DateTime<Utc>,
        snapshot: Arc<KeySnapshot>,
        hint: Option<Duration>,
        started_generation: u64,
    ) -> bool {
        self.snapshot = Some(snapshot);

        if let Some(max_age) = hint {
            let window = FreshnessWindow::server_hint(max_age);
            if window != self.window {
                tracing::info!(
                    max_age_secs = max_age.as_secs(),
                    previous_secs = self.window.duration.as_secs(),
                    "freshness window overridden by server hint"
                );
            }
            self.window = window;
        }

        if self.generation == started_generation {
            self.last_refreshed_at = Some(now);
            true
        } else {
            self.last_refreshed_at = None;
            false
        }
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.last_refreshed_at = None;
    }
}

/// Current key snapshot and the freshness bookkeeping around it.
///
/// Performs no I/O. Refreshes are driven by
/// [`RefreshCoordinator`](crate::RefreshCoordinator), which uses the same
/// lock to register in-flight fetches.
pub struct KeyCache {
    state: Mutex<CacheState>,
    clock: Arc<dyn Clock>,
}

impl KeyCache {
    /// Creates an empty cache with `default_window` as its initial window.
    pub fn new(clock: Arc<dyn Clock>, default_window: Duration) -> Self {
        Self { state: Mutex::new(CacheState::new(FreshnessWindow::configured(default_window))), clock }
    }

    /// Returns `true` if a snapshot exists and is within its window.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        let now = self.clock.now();
        self.state.lock().is_fresh_at(now)
    }

    /// Current snapshot, fresh or not. `None` before the first refresh.
    #[must_use]
    pub fn read_snapshot(&self) -> Option<Arc<KeySnapshot>> {
        self.state.lock().snapshot()
    }

    /// Installs `snapshot`, stamps it with the current time, and applies
    /// `hint` to the freshness window if given.
    pub fn commit(&self, snapshot: Arc<KeySnapshot>, hint: Option<Duration>) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let generation = state.generation();
        state.commit(now, snapshot, hint, generation);
    }

    /// The window currently in effect.
    #[must_use]
    pub fn freshness_window(&self) -> FreshnessWindow {
        self.state.lock().window
    }

    /// When the current snapshot was last marked fresh.
    #[must_use]
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_refreshed_at
    }

    /// Returns `true` while a refresh is outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Marks the current snapshot stale. The snapshot stays readable.
    #[tracing::instrument(skip(self))]
    pub fn invalidate(&self) {
        let generation = {
            let mut state = self.state.lock();
            state.invalidate();
            state.generation()
        };
        tracing::info!(
            audit.action = "invalidate_key_cache",
            audit.resource = "signing_keys",
            audit.result = "success",
            generation,
            "audit_event"
        );
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock()
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("KeyCache")
            .field("has_snapshot", &state.snapshot.is_some())
            .field("last_refreshed_at", &state.last_refreshed_at)
            .field("window", &state.window)
            .field("refreshing", &state.in_flight.is_some())
            .finish()
    }
}
