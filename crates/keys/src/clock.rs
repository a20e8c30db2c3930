//! Time source abstraction.
//!
//! Key expiration and cache freshness both depend on "now". Components take
//! an `Arc<dyn Clock>` so tests can move time forward without sleeping (see
//! `testutil::MockClock`).

use chrono::{DateTime, Utc};

/// Supplies the current instant in UTC.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
