//! Time module for the timeline player
//!
//! Times are rational: a value counted at a rate (usually frames at the
//! timeline frame rate, or samples at the audio sample rate). Ranges are a
//! start time plus a duration, with an inclusive end one unit before the
//! exclusive end.

pub mod util;

pub use util::{
    loop_range, loop_seconds, loop_seconds_range, loop_time, to_ranges, CacheDir,
};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A time value counted at a rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationalTime {
    value: f64,
    rate: f64,
}

impl RationalTime {
    /// Create a new time
    pub const fn new(value: f64, rate: f64) -> Self {
        Self { value, rate }
    }

    /// An invalid time, used before a timeline is known
    pub const fn invalid() -> Self {
        Self { value: 0.0, rate: -1.0 }
    }

    pub fn is_valid(&self) -> bool {
        self.rate > 0.0 && self.value.is_finite()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The value expressed at another rate
    pub fn value_rescaled_to(&self, rate: f64) -> f64 {
        if rate == self.rate {
            self.value
        } else {
            self.value * rate / self.rate
        }
    }

    /// This time expressed at another rate
    pub fn rescaled_to(&self, rate: f64) -> Self {
        Self::new(self.value_rescaled_to(rate), rate)
    }

    pub fn to_seconds(&self) -> f64 {
        self.value / self.rate
    }

    pub fn from_seconds(seconds: f64, rate: f64) -> Self {
        Self::new(seconds * rate, rate)
    }

    pub fn floor(&self) -> Self {
        Self::new(self.value.floor(), self.rate)
    }

    pub fn ceil(&self) -> Self {
        Self::new(self.value.ceil(), self.rate)
    }

    pub fn round(&self) -> Self {
        Self::new(self.value.round(), self.rate)
    }

    /// Whole units (frames) at the current rate, rounded down
    pub fn frame(&self) -> i64 {
        self.value.floor() as i64
    }

    fn common_rate(&self, other: &Self) -> f64 {
        self.rate.max(other.rate)
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        let rate = self.common_rate(other);
        self.value_rescaled_to(rate) == other.value_rescaled_to(rate)
    }
}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let rate = self.common_rate(other);
        self.value_rescaled_to(rate)
            .partial_cmp(&other.value_rescaled_to(rate))
    }
}

impl Add for RationalTime {
    type Output = RationalTime;

    fn add(self, other: Self) -> Self {
        let rate = self.common_rate(&other);
        Self::new(self.value_rescaled_to(rate) + other.value_rescaled_to(rate), rate)
    }
}

impl Sub for RationalTime {
    type Output = RationalTime;

    fn sub(self, other: Self) -> Self {
        let rate = self.common_rate(&other);
        Self::new(self.value_rescaled_to(rate) - other.value_rescaled_to(rate), rate)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.rate)
    }
}

/// A range of time: start plus duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    start_time: RationalTime,
    duration: RationalTime,
}

impl TimeRange {
    pub const fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self { start_time, duration }
    }

    pub const fn invalid() -> Self {
        Self::new(RationalTime::invalid(), RationalTime::invalid())
    }

    /// Range from a start time and an inclusive end time
    pub fn from_start_end_inclusive(start: RationalTime, end: RationalTime) -> Self {
        let rate = start.rate();
        let duration = end.value_rescaled_to(rate) - start.value() + 1.0;
        Self::new(start, RationalTime::new(duration, rate))
    }

    /// Range from a start time and an exclusive end time
    pub fn from_start_end_exclusive(start: RationalTime, end: RationalTime) -> Self {
        let rate = start.rate();
        Self::new(start, RationalTime::new(end.value_rescaled_to(rate) - start.value(), rate))
    }

    pub fn start_time(&self) -> RationalTime {
        self.start_time
    }

    pub fn duration(&self) -> RationalTime {
        self.duration
    }

    pub fn is_valid(&self) -> bool {
        self.start_time.is_valid() && self.duration.is_valid()
    }

    pub fn is_empty(&self) -> bool {
        self.duration.value() <= 0.0
    }

    pub fn end_time_exclusive(&self) -> RationalTime {
        self.start_time + self.duration
    }

    /// The last whole unit inside the range
    pub fn end_time_inclusive(&self) -> RationalTime {
        let end = self.end_time_exclusive();
        if (end - self.start_time.rescaled_to(self.duration.rate())).value() > 1.0 {
            if self.duration.value() != self.duration.value().floor() {
                RationalTime::new(end.value().floor(), end.rate())
            } else {
                end - RationalTime::new(1.0, self.duration.rate())
            }
        } else {
            self.start_time
        }
    }

    pub fn contains(&self, time: RationalTime) -> bool {
        self.start_time <= time && time < self.end_time_exclusive()
    }

    /// Clamp a time into the range
    pub fn clamp(&self, time: RationalTime) -> RationalTime {
        if time < self.start_time {
            self.start_time
        } else if time > self.end_time_inclusive() {
            self.end_time_inclusive()
        } else {
            time
        }
    }

    /// The overlap of two ranges, if any
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = if self.start_time > other.start_time { self.start_time } else { other.start_time };
        let end = if self.end_time_exclusive() < other.end_time_exclusive() {
            self.end_time_exclusive()
        } else {
            other.end_time_exclusive()
        };
        if start < end {
            Some(TimeRange::from_start_end_exclusive(start, end))
        } else {
            None
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start_time, self.end_time_inclusive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale() {
        let t = RationalTime::new(24.0, 24.0);
        assert_eq!(t.rescaled_to(48.0).value(), 48.0);
        assert_eq!(t.to_seconds(), 1.0);
        assert_eq!(RationalTime::from_seconds(2.0, 48000.0).value(), 96000.0);
        assert_eq!(t, RationalTime::new(1.0, 1.0));
        assert!(RationalTime::new(1.0, 24.0) < RationalTime::new(1.0, 12.0));
        assert!(!RationalTime::invalid().is_valid());
    }

    #[test]
    fn test_range_ends() {
        let range = TimeRange::new(RationalTime::new(0.0, 24.0), RationalTime::new(240.0, 24.0));
        assert_eq!(range.end_time_inclusive(), RationalTime::new(239.0, 24.0));
        assert_eq!(range.end_time_exclusive(), RationalTime::new(240.0, 24.0));
        assert!(range.contains(RationalTime::new(239.0, 24.0)));
        assert!(!range.contains(RationalTime::new(240.0, 24.0)));

        let single = TimeRange::new(RationalTime::new(10.0, 24.0), RationalTime::new(1.0, 24.0));
        assert_eq!(single.end_time_inclusive(), RationalTime::new(10.0, 24.0));

        let inclusive = TimeRange::from_start_end_inclusive(
            RationalTime::new(7.0, 24.0),
            RationalTime::new(8.0, 24.0),
        );
        assert_eq!(inclusive.duration().value(), 2.0);
    }

    #[test]
    fn test_clamp_and_intersection() {
        let range = TimeRange::new(RationalTime::new(10.0, 24.0), RationalTime::new(10.0, 24.0));
        assert_eq!(range.clamp(RationalTime::new(0.0, 24.0)).value(), 10.0);
        assert_eq!(range.clamp(RationalTime::new(50.0, 24.0)).value(), 19.0);

        let other = TimeRange::new(RationalTime::new(15.0, 24.0), RationalTime::new(10.0, 24.0));
        let overlap = range.intersection(&other).unwrap();
        assert_eq!(overlap.start_time().value(), 15.0);
        assert_eq!(overlap.duration().value(), 5.0);

        let far = TimeRange::new(RationalTime::new(100.0, 24.0), RationalTime::new(1.0, 24.0));
        assert!(range.intersection(&far).is_none());
    }
}
