//! time utilities.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Converts a Duration to milliseconds as i64 with saturation.
///
/// Large durations saturate at i64::MAX.
fn duration_as_millis_i64(d: Duration) -> i64 {
    let ms = d.as_millis();
    if ms > i64::MAX as u128 {
        i64::MAX
    } else {
        ms as i64
    }
}

#[inline]
/// Returns the current unix timestamp in milliseconds as i64.
///
/// This reads the system clock each call.
/// The value is negative only if the system clock is before the unix epoch.
pub fn unix_timestamp_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => duration_as_millis_i64(d),
        Err(e) => -duration_as_millis_i64(e.duration()),
    }
}

/// Converts unix milliseconds to unix seconds, rounding half away from zero.
///
/// This is how expiry claims are derived from a millisecond clock.
pub fn unix_seconds_rounded(unix_ms: i64) -> i64 {
    let secs = unix_ms / 1000;
    let rem = unix_ms % 1000;
    if rem >= 500 {
        secs + 1
    } else if rem <= -500 {
        secs - 1
    } else {
        secs
    }
}

/// Converts unix milliseconds to whole unix seconds, rounding towards negative infinity.
pub fn unix_seconds_floor(unix_ms: i64) -> i64 {
    unix_ms.div_euclid(1000)
}

/// Source of wall clock time.
///
/// Everything time sensitive in kuvert reads the time through a [`Clock`],
/// so that expiry behaviour can be pinned down in tests.
pub trait Clock: Send + Sync + 'static {
    /// Current unix timestamp in milliseconds.
    fn now_unix_ms(&self) -> i64;

    /// Current unix timestamp in whole seconds.
    fn now_unix_secs(&self) -> i64 {
        unix_seconds_floor(self.now_unix_ms())
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now_unix_ms(&self) -> i64 {
        (**self).now_unix_ms()
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// [`Clock`] backed by [`SystemTime`].
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_unix_ms(&self) -> i64 {
        unix_timestamp_millis()
    }
}

/// [`Clock`] which only moves when told to.
///
/// Cloning shares the underlying time, so a clone handed to a component
/// can be advanced from the outside.
#[derive(Clone, Default)]
pub struct ManualClock {
    unix_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a [`ManualClock`] frozen at the given unix timestamp in milliseconds.
    pub fn new(unix_ms: i64) -> Self {
        Self {
            unix_ms: Arc::new(AtomicI64::new(unix_ms)),
        }
    }

    /// Set the clock to the given unix timestamp in milliseconds.
    pub fn set_unix_ms(&self, unix_ms: i64) {
        self.unix_ms.store(unix_ms, Ordering::SeqCst);
    }

    /// Move the clock forward by the given duration.
    pub fn advance(&self, by: Duration) {
        self.unix_ms
            .fetch_add(duration_as_millis_i64(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_ms(&self) -> i64 {
        self.unix_ms.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("unix_ms", &self.now_unix_ms())
            .finish()
    }
}
