//! Monotonic-ish time value with microsecond precision.
//!
//! [`TimeValue`] is a seconds/microseconds pair used for timer deadlines and
//! elapsed-time arithmetic throughout the runtime. It deliberately does not
//! wrap `std::time::Instant` or `SystemTime` directly so that the invariant
//! `0 <= micros < 1_000_000` is enforced at every mutation site rather than
//! left to whatever normalization the standard library happens to do.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MICROS_PER_SEC: i64 = 1_000_000;

/// An absolute or relative point in time, seconds plus microseconds.
///
/// `0 <= micros < 1_000_000` is maintained as an invariant by every
/// constructor and mutator on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeValue {
    secs: i64,
    micros: i64,
}

impl TimeValue {
    /// The zero time value.
    pub fn zero() -> Self {
        TimeValue { secs: 0, micros: 0 }
    }

    /// The current wall-clock time, relative to the Unix epoch.
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        TimeValue {
            secs: d.as_secs() as i64,
            micros: d.subsec_micros() as i64,
        }
    }

    /// Construct from raw seconds and microseconds, normalizing overflow in
    /// `micros` into `secs`.
    pub fn new(secs: i64, micros: i64) -> Self {
        let mut tv = TimeValue { secs, micros: 0 };
        tv.add_micros(micros);
        tv
    }

    /// Reset to zero.
    pub fn clear(&mut self) {
        self.secs = 0;
        self.micros = 0;
    }

    /// Set this value to the current wall-clock time.
    pub fn set_now(&mut self) {
        *self = TimeValue::now();
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }

    /// Total microseconds since this value's origin.
    pub fn as_micros(&self) -> i64 {
        self.secs * MICROS_PER_SEC + self.micros
    }

    /// Add a (possibly negative) number of microseconds, normalizing.
    pub fn add_micros(&mut self, delta: i64) {
        let total = self.as_micros() + delta;
        self.secs = total.div_euclid(MICROS_PER_SEC);
        self.micros = total.rem_euclid(MICROS_PER_SEC);
    }

    /// Add a (possibly negative) number of milliseconds.
    pub fn add_millis(&mut self, delta_ms: i64) {
        self.add_micros(delta_ms * 1_000);
    }

    /// Return a copy of this value with `delta_ms` milliseconds added.
    pub fn plus_millis(&self, delta_ms: i64) -> Self {
        let mut tv = *self;
        tv.add_millis(delta_ms);
        tv
    }

    /// Non-negative span from `earlier` to `self`. Panics if `self` is
    /// earlier than `earlier` — callers choose operand order themselves, per
    /// the spec's "subtract into a non-negative span" contract.
    pub fn since(&self, earlier: &TimeValue) -> Duration {
        let diff = self.as_micros() - earlier.as_micros();
        debug_assert!(diff >= 0, "TimeValue::since called with earlier > self");
        Duration::from_micros(diff.max(0) as u64)
    }

    /// Milliseconds remaining until `self`, relative to `now`. Zero if
    /// `self` is not after `now`.
    pub fn millis_until(&self, now: &TimeValue) -> u64 {
        let diff = self.as_micros() - now.as_micros();
        if diff <= 0 {
            0
        } else {
            (diff / 1_000) as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_micros_in_range() {
        let tv = TimeValue::new(0, 1_500_000);
        assert_eq!(tv.secs(), 1);
        assert_eq!(tv.micros(), 500_000);
    }

    #[test]
    fn negative_micros_normalize_into_prior_second() {
        let tv = TimeValue::new(5, -1);
        assert_eq!(tv.secs(), 4);
        assert_eq!(tv.micros(), 999_999);
    }

    #[test]
    fn round_trip_add_then_subtract_millis() {
        let t = TimeValue::now();
        for d_ms in [0i64, 1, 17, 999, 1_000, 12_345] {
            let later = t.plus_millis(d_ms);
            let span = later.since(&t);
            assert_eq!(span.as_millis() as i64, d_ms, "failed for d_ms={d_ms}");
        }
    }

    #[test]
    fn millis_until_is_zero_when_not_in_future() {
        let t = TimeValue::now();
        let past = t.plus_millis(-50);
        assert_eq!(past.millis_until(&t), 0);
        assert_eq!(t.millis_until(&t), 0);
    }

    #[test]
    fn ordering_is_total() {
        let a = TimeValue::new(1, 0);
        let b = TimeValue::new(1, 1);
        let c = TimeValue::new(2, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }
}
