//! Time type used on every outgoing buffer and event.
//!
//! The engine reports timestamps as floating-point seconds and positions as
//! signed milliseconds; the downstream pipeline works in nanoseconds.
//! [`ClockTime`] is the single conversion point between the two.

/// Unsigned nanoseconds with a `NONE` sentinel for unset stop times.
///
///
/// ```rust
/// use aamp_bridge::clock::ClockTime;
///
/// let pts = ClockTime::from_secs_f64(1.5);
/// assert_eq!(pts.millis(), 1500);
/// assert_eq!(format!("{}", pts), "1.500s");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClockTime(u64);

impl ClockTime {
    /// Start of the timeline.
    pub const ZERO: Self = Self(0);

    /// Largest time that is not the sentinel.
    pub const MAX: Self = Self(u64::MAX - 1);

    /// Unset.
    pub const NONE: Self = Self(u64::MAX);

    /// Nanoseconds per second.
    pub const SECOND: u64 = 1_000_000_000;

    /// Nanoseconds per millisecond.
    pub const MSECOND: u64 = 1_000_000;

    /// From nanoseconds.
    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    /// From milliseconds, saturating.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(Self::MSECOND))
    }

    /// From whole seconds, saturating.
    #[inline]
    pub const fn from_secs(s: u64) -> Self {
        Self(s.saturating_mul(Self::SECOND))
    }

    /// From engine seconds, truncating to whole nanoseconds.
    ///
    /// Negative and NaN inputs clamp to zero; values past the representable
    /// range clamp to [`ClockTime::MAX`].
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        let ns = secs * Self::SECOND as f64;
        if ns.is_nan() || ns <= 0.0 {
            Self::ZERO
        } else if ns >= Self::MAX.0 as f64 {
            Self::MAX
        } else {
            Self(ns as u64)
        }
    }

    /// From the engine's signed position or duration in milliseconds.
    ///
    /// Negative values (engine not yet positioned) clamp to zero.
    #[inline]
    pub const fn from_engine_millis(ms: i64) -> Self {
        if ms <= 0 {
            Self::ZERO
        } else {
            Self::from_millis(ms as u64)
        }
    }

    /// Nanoseconds.
    #[inline]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Whole milliseconds.
    #[inline]
    pub const fn millis(self) -> u64 {
        self.0 / Self::MSECOND
    }

    /// Whole seconds.
    #[inline]
    pub const fn secs(self) -> u64 {
        self.0 / Self::SECOND
    }

    /// Seconds, as the engine takes them.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::SECOND as f64
    }

    /// Whether this is [`ClockTime::NONE`].
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            let secs = self.secs();
            let ms = (self.0 / Self::MSECOND) % 1000;
            write!(f, "{}.{:03}s", secs, ms)
        }
    }
}
