//! Monotonic Clock
//!
//! Pose samples carry timestamps in nanoseconds relative to a process-wide
//! origin. Hosts that already have their own clock (an XR runtime's predicted
//! display time, for example) can build timestamps directly with
//! [`Timestamp::from_nanos`]; only ordering matters to the engine.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Process-wide origin, captured on first use
static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Monotonic clock anchored at the first call to [`Clock::init`] or [`Clock::now_nanos`].
#[derive(Debug, Clone, Copy)]
pub struct Clock;

impl Clock {
    /// Anchor the clock origin. Calling it more than once is harmless.
    pub fn init() {
        ORIGIN.get_or_init(Instant::now);
    }

    /// Nanoseconds elapsed since the origin.
    #[inline]
    pub fn now_nanos() -> u64 {
        let origin = ORIGIN.get_or_init(Instant::now);
        // u64 nanoseconds cover ~584 years of uptime
        origin.elapsed().as_nanos() as u64
    }

    /// Nanoseconds between two readings. Returns 0 if end < start.
    #[inline]
    pub fn elapsed_nanos(start: u64, end: u64) -> u64 {
        end.saturating_sub(start)
    }

    /// Check if two readings maintain monotonicity.
    /// Returns true if t2 >= t1.
    #[inline]
    pub fn is_monotonic(t1: u64, t2: u64) -> bool {
        t2 >= t1
    }
}

/// A point on the engine's monotonic time axis, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from nanoseconds.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Build a timestamp from fractional seconds, as reported by most
    /// engine frame clocks. Negative values clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs <= 0.0 || !secs.is_finite() {
            return Self(0);
        }
        Self((secs * 1_000_000_000.0) as u64)
    }

    /// Capture current timestamp.
    #[inline]
    pub fn now() -> Self {
        Self(Clock::now_nanos())
    }

    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Duration since an earlier timestamp (saturating at zero).
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(Clock::elapsed_nanos(earlier.0, self.0))
    }

    /// Check if this timestamp is strictly after another.
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Timestamp(nanos))
    }
}
