//! Animation time points and validity intervals.
//!
//! Time is measured in integer ticks. An interval is a closed range
//! `[start, end]`; the empty interval is encoded as `(-inf, -inf)` so that
//! intersecting anything with it stays empty.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Animation time in ticks.
pub type TimePoint = i32;

/// Number of time ticks per second of animation.
pub const TICKS_PER_SECOND: TimePoint = 4800;

pub const TIME_NEGATIVE_INFINITY: TimePoint = TimePoint::MIN;
pub const TIME_POSITIVE_INFINITY: TimePoint = TimePoint::MAX;

#[inline]
pub fn time_to_seconds(t: TimePoint) -> f64 {
    t as f64 / TICKS_PER_SECOND as f64
}

#[inline]
pub fn time_from_seconds(seconds: f64) -> TimePoint {
    (seconds * TICKS_PER_SECOND as f64 + 0.5).ceil() as TimePoint
}

/// A closed range of animation time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: TimePoint,
    end: TimePoint,
}

impl TimeInterval {
    #[inline]
    pub const fn new(start: TimePoint, end: TimePoint) -> Self {
        Self { start, end }
    }

    /// Interval consisting of a single time instant.
    #[inline]
    pub const fn instant(time: TimePoint) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    #[inline]
    pub const fn infinite() -> Self {
        Self::new(TIME_NEGATIVE_INFINITY, TIME_POSITIVE_INFINITY)
    }

    #[inline]
    pub const fn empty() -> Self {
        Self::new(TIME_NEGATIVE_INFINITY, TIME_NEGATIVE_INFINITY)
    }

    #[inline]
    pub fn start(&self) -> TimePoint {
        self.start
    }

    #[inline]
    pub fn end(&self) -> TimePoint {
        self.end
    }

    pub fn set_start(&mut self, start: TimePoint) {
        self.start = start;
    }

    pub fn set_end(&mut self, end: TimePoint) {
        self.end = end;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == TIME_NEGATIVE_INFINITY || self.start > self.end
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.start == TIME_NEGATIVE_INFINITY && self.end == TIME_POSITIVE_INFINITY
    }

    pub fn set_empty(&mut self) {
        *self = Self::empty();
    }

    pub fn set_infinite(&mut self) {
        *self = Self::infinite();
    }

    pub fn set_instant(&mut self, time: TimePoint) {
        *self = Self::instant(time);
    }

    /// Difference between end and start. Saturates for unbounded intervals.
    pub fn duration(&self) -> TimePoint {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn contains(&self, time: TimePoint) -> bool {
        self.start <= time && time <= self.end
    }

    /// Narrows this interval to its overlap with `other`.
    pub fn intersect(&mut self, other: &TimeInterval) {
        if self.end < other.start || self.start > other.end || other.is_empty() {
            self.set_empty();
        } else if !other.is_infinite() {
            self.start = self.start.max(other.start);
            self.end = self.end.min(other.end);
            debug_assert!(self.start <= self.end);
        }
    }

    /// Returns the overlap of two intervals without modifying either.
    pub fn intersection(mut self, other: &TimeInterval) -> TimeInterval {
        self.intersect(other);
        self
    }

    /// Tests whether two intervals overlap fully or partially.
    pub fn overlap(&self, iv: &TimeInterval) -> bool {
        if self.is_empty() || iv.is_empty() {
            return false;
        }
        if self.start >= iv.start && self.start <= iv.end {
            return true;
        }
        if self.end >= iv.start && self.end <= iv.end {
            return true;
        }
        iv.start >= self.start && iv.start <= self.end
    }
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: TimePoint| match t {
            TIME_NEGATIVE_INFINITY => "-inf".to_string(),
            TIME_POSITIVE_INFINITY => "+inf".to_string(),
            t => t.to_string(),
        };
        if self.is_empty() {
            write!(f, "TimeInterval(empty)")
        } else {
            write!(f, "TimeInterval[{}, {}]", bound(self.start), bound(self.end))
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_and_infinite() {
        let empty = TimeInterval::empty();
        assert!(empty.is_empty());
        assert!(!empty.contains(0));
        assert!(!empty.contains(TIME_NEGATIVE_INFINITY + 1));
        assert_eq!(TimeInterval::default(), empty);

        let inf = TimeInterval::infinite();
        assert!(inf.is_infinite());
        assert!(!inf.is_empty());
        assert!(inf.contains(0));
        assert!(inf.contains(TIME_POSITIVE_INFINITY));
    }

    #[test]
    fn test_reversed_interval_is_empty() {
        assert!(TimeInterval::new(10, 5).is_empty());
        assert!(!TimeInterval::instant(5).is_empty());
    }

    #[test]
    fn test_intersect() {
        let mut iv = TimeInterval::new(0, 100);
        iv.intersect(&TimeInterval::new(50, 200));
        assert_eq!(iv, TimeInterval::new(50, 100));

        iv.intersect(&TimeInterval::infinite());
        assert_eq!(iv, TimeInterval::new(50, 100));

        iv.intersect(&TimeInterval::new(200, 300));
        assert!(iv.is_empty());

        let mut iv = TimeInterval::infinite();
        iv.intersect(&TimeInterval::empty());
        assert!(iv.is_empty());
    }

    #[test]
    fn test_overlap() {
        let a = TimeInterval::new(0, 10);
        assert!(a.overlap(&TimeInterval::new(10, 20)));
        assert!(a.overlap(&TimeInterval::new(-5, 0)));
        assert!(a.overlap(&TimeInterval::new(2, 3)));
        assert!(!a.overlap(&TimeInterval::new(11, 20)));
        assert!(!a.overlap(&TimeInterval::empty()));
    }

    #[test]
    fn test_seconds_conversion() {
        assert_eq!(time_to_seconds(TICKS_PER_SECOND), 1.0);
        assert_eq!(time_to_seconds(TICKS_PER_SECOND / 2), 0.5);
    }

    proptest! {
        #[test]
        fn prop_intersection_never_widens(
            a in -1000i32..1000, b in -1000i32..1000,
            c in -1000i32..1000, d in -1000i32..1000,
            t in -1000i32..1000,
        ) {
            let first = TimeInterval::new(a.min(b), a.max(b));
            let second = TimeInterval::new(c.min(d), c.max(d));
            let both = first.intersection(&second);
            prop_assert_eq!(both.contains(t), first.contains(t) && second.contains(t));
        }
    }
}
