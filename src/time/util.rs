//! Time utilities
//!
//! Loop arithmetic used by seeking, playback and the cache window, plus
//! grouping of cached frame times into contiguous ranges.

use super::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Direction the frame cache is filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CacheDir {
    #[default]
    Forward,
    Reverse,
}

/// Wrap a time into a range
///
/// Returns the wrapped time and whether wrapping happened. Wrapping is
/// modular, so the result is idempotent. A range with no duration leaves the
/// time unchanged.
pub fn loop_time(time: RationalTime, range: &TimeRange) -> (RationalTime, bool) {
    let rate = range.duration().rate();
    let duration = range.duration().value();
    if duration <= 0.0 || rate <= 0.0 {
        return (time, false);
    }

    let start = range.start_time().value_rescaled_to(rate);
    let value = time.value_rescaled_to(rate);
    if value < start || value >= start + duration {
        let wrapped = start + (value - start).rem_euclid(duration);
        (RationalTime::new(wrapped, rate).rescaled_to(time.rate()), true)
    } else {
        (time, false)
    }
}

/// Wrap whole seconds into an inclusive range of seconds
pub fn loop_seconds(value: i64, range: &RangeInclusive<i64>) -> (i64, bool) {
    let start = *range.start();
    let duration = range.end() - start + 1;
    if duration <= 0 {
        return (value, false);
    }
    if value < start || value > *range.end() {
        (start + (value - start).rem_euclid(duration), true)
    } else {
        (value, false)
    }
}

/// Split an inclusive range that crosses the bounds into in-bounds pieces
///
/// A range that starts before the bounds wraps its head to the end of the
/// bounds; a range that runs past the end wraps its tail to the start. A
/// range wider than the bounds covers the whole bounds, and a range that
/// misses the bounds entirely yields nothing.
pub fn loop_seconds_range(
    range: RangeInclusive<i64>,
    bounds: RangeInclusive<i64>,
) -> Vec<RangeInclusive<i64>> {
    let (rs, re) = (*range.start(), *range.end());
    let (bs, be) = (*bounds.start(), *bounds.end());
    if re < rs || be < bs {
        return Vec::new();
    }

    if rs >= bs && re <= be {
        vec![rs..=re]
    } else if rs < bs && re > be {
        vec![bs..=be]
    } else if rs < bs && re >= bs {
        vec![(be - (bs - rs - 1)).max(bs)..=be, bs..=re]
    } else if rs <= be && re > be {
        vec![rs..=be, bs..=(bs + (re - be - 1)).min(be)]
    } else {
        Vec::new()
    }
}

/// Time range version of [`loop_seconds_range`], in whole frames of the bounds' rate
pub fn loop_range(range: &TimeRange, bounds: &TimeRange) -> Vec<TimeRange> {
    let rate = bounds.duration().rate();
    let frames = |range: &TimeRange| {
        range.start_time().value_rescaled_to(rate).floor() as i64
            ..=range.end_time_inclusive().value_rescaled_to(rate).floor() as i64
    };
    loop_seconds_range(frames(range), frames(bounds))
        .into_iter()
        .map(|r| {
            TimeRange::from_start_end_inclusive(
                RationalTime::new(*r.start() as f64, rate),
                RationalTime::new(*r.end() as f64, rate),
            )
        })
        .collect()
}

/// Group frame times into contiguous ranges
///
/// Times are sorted first; a gap of more than one frame starts a new range.
pub fn to_ranges(mut times: Vec<RationalTime>) -> Vec<TimeRange> {
    let mut out = Vec::new();
    if times.is_empty() {
        return out;
    }
    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rate = times[0].rate();
    let one = RationalTime::new(1.0, rate);
    let mut range = TimeRange::new(times[0], one);
    let mut prev = times[0];
    for &time in &times[1..] {
        if time - prev > one {
            out.push(range);
            range = TimeRange::new(time, one);
        } else {
            range = TimeRange::from_start_end_inclusive(range.start_time(), time);
        }
        prev = time;
    }
    out.push(range);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(value: f64) -> RationalTime {
        RationalTime::new(value, 24.0)
    }

    fn range(start: f64, duration: f64) -> TimeRange {
        TimeRange::new(t(start), t(duration))
    }

    #[test]
    fn test_loop_time() {
        let r = range(0.0, 10.0);
        assert_eq!(loop_time(t(5.0), &r), (t(5.0), false));
        assert_eq!(loop_time(t(10.0), &r), (t(0.0), true));
        assert_eq!(loop_time(t(-1.0), &r), (t(9.0), true));
        assert_eq!(loop_time(t(25.0), &r), (t(5.0), true));
        assert_eq!(loop_time(t(-21.0), &r), (t(9.0), true));
    }

    #[test]
    fn test_loop_time_idempotent() {
        let r = range(12.0, 37.0);
        for value in -200..200 {
            let (once, _) = loop_time(t(value as f64), &r);
            let (twice, looped) = loop_time(once, &r);
            assert_eq!(once, twice);
            assert!(!looped);
            assert!(r.contains(once));
        }
    }

    #[test]
    fn test_loop_time_empty_range() {
        let r = range(5.0, 0.0);
        assert_eq!(loop_time(t(100.0), &r), (t(100.0), false));
    }

    #[test]
    fn test_loop_seconds() {
        assert_eq!(loop_seconds(3, &(0..=9)), (3, false));
        assert_eq!(loop_seconds(10, &(0..=9)), (0, true));
        assert_eq!(loop_seconds(-1, &(0..=9)), (9, true));
    }

    #[test]
    fn test_loop_seconds_range() {
        assert_eq!(loop_seconds_range(2..=5, 0..=9), vec![2..=5]);
        assert_eq!(loop_seconds_range(-5..=20, 0..=9), vec![0..=9]);
        assert_eq!(loop_seconds_range(-2..=3, 0..=9), vec![8..=9, 0..=3]);
        assert_eq!(loop_seconds_range(7..=11, 0..=9), vec![7..=9, 0..=1]);
        assert!(loop_seconds_range(20..=30, 0..=9).is_empty());
    }

    #[test]
    fn test_loop_range_split_at_boundary() {
        let bounds = range(0.0, 100.0);
        let pieces = loop_range(&range(90.0, 20.0), &bounds);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].start_time(), t(90.0));
        assert_eq!(pieces[0].end_time_inclusive(), t(99.0));
        assert_eq!(pieces[1].start_time(), t(0.0));
        assert_eq!(pieces[1].end_time_inclusive(), t(9.0));
    }

    #[test]
    fn test_to_ranges() {
        let times = [1.0, 2.0, 3.0, 7.0, 8.0, 10.0].iter().map(|v| t(*v)).collect();
        let ranges = to_ranges(times);
        assert_eq!(ranges.len(), 3);
        assert_eq!((ranges[0].start_time(), ranges[0].end_time_inclusive()), (t(1.0), t(3.0)));
        assert_eq!((ranges[1].start_time(), ranges[1].end_time_inclusive()), (t(7.0), t(8.0)));
        assert_eq!((ranges[2].start_time(), ranges[2].end_time_inclusive()), (t(10.0), t(10.0)));
    }

    #[test]
    fn test_to_ranges_unsorted_with_duplicates() {
        let times = [5.0, 3.0, 4.0, 4.0].iter().map(|v| t(*v)).collect();
        let ranges = to_ranges(times);
        assert_eq!(ranges, vec![TimeRange::from_start_end_inclusive(t(3.0), t(5.0))]);
        assert!(to_ranges(Vec::new()).is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_loop_time_lands_in_range(value in -10_000i64..10_000, start in -500i64..500, duration in 1i64..500) {
            let r = range(start as f64, duration as f64);
            let (once, _) = loop_time(t(value as f64), &r);
            proptest::prop_assert!(r.contains(once));
            proptest::prop_assert_eq!(loop_time(once, &r), (once, false));
        }

        #[test]
        fn prop_loop_seconds_range_stays_in_bounds(start in -50i64..50, len in 0i64..30) {
            let pieces = loop_seconds_range(start..=start + len, 0..=9);
            proptest::prop_assert!(pieces.iter().all(|p| *p.start() >= 0 && *p.end() <= 9 && p.start() <= p.end()));
            if start <= 9 && start + len >= 0 {
                proptest::prop_assert!(pieces.iter().any(|p| p.contains(&start.clamp(0, 9))));
            }
        }
    }
}
