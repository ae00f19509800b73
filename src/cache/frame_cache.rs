//! Frame cache
//!
//! Video frames are keyed by whole frame at the timeline rate and owned by
//! the decode thread. Audio buckets are keyed by whole second and live
//! behind their own lock, shared with the audio callback. Both maps track
//! their resident bytes and refuse inserts past the budget.

use super::{PlayerCacheInfo, PlayerCacheOptions};
use crate::time::{loop_seconds_range, to_ranges, CacheDir, RationalTime, TimeRange};
use crate::timeline::{AudioFrame, VideoFrame};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Audio buckets shared with the audio callback
pub type AudioCache = Arc<Mutex<BTreeMap<i64, AudioFrame>>>;

/// Cached frames and their byte accounting
pub struct FrameCache {
    video: BTreeMap<i64, Vec<VideoFrame>>,
    video_bytes: usize,
    video_max_bytes: usize,

    audio: AudioCache,
    audio_bytes: usize,
    audio_max_bytes: usize,
}

impl FrameCache {
    pub fn new(audio: AudioCache, options: &PlayerCacheOptions) -> Self {
        Self {
            video: BTreeMap::new(),
            video_bytes: 0,
            video_max_bytes: options.video_max_bytes(),
            audio,
            audio_bytes: 0,
            audio_max_bytes: options.audio_max_bytes(),
        }
    }

    /// Apply new budgets, evicting everything if they shrank
    pub fn set_options(&mut self, options: &PlayerCacheOptions) {
        let video_max = options.video_max_bytes();
        let audio_max = options.audio_max_bytes();
        if video_max < self.video_bytes || audio_max < self.audio_bytes {
            self.clear();
        }
        self.video_max_bytes = video_max;
        self.audio_max_bytes = audio_max;
    }

    pub fn video_bytes(&self) -> usize {
        self.video_bytes
    }

    pub fn video_max_bytes(&self) -> usize {
        self.video_max_bytes
    }

    pub fn audio_bytes(&self) -> usize {
        self.audio_bytes
    }

    pub fn audio_max_bytes(&self) -> usize {
        self.audio_max_bytes
    }

    pub fn contains_video(&self, frame: i64) -> bool {
        self.video.contains_key(&frame)
    }

    /// Cached frames for a key, one per source
    pub fn video(&self, frame: i64) -> Option<&Vec<VideoFrame>> {
        self.video.get(&frame)
    }

    pub fn video_len(&self) -> usize {
        self.video.len()
    }

    /// Cached frames with keys in `range`
    pub fn video_range(&self, range: RangeInclusive<i64>) -> impl Iterator<Item = (&i64, &Vec<VideoFrame>)> {
        self.video.range(range)
    }

    /// Insert the frames for a key
    ///
    /// Returns false, leaving the cache untouched, if the insert would exceed
    /// the budget.
    pub fn insert_video(&mut self, frame: i64, frames: Vec<VideoFrame>) -> bool {
        let bytes: usize = frames.iter().map(VideoFrame::byte_count).sum();
        let replaced = self.video.get(&frame).map_or(0, |f| f.iter().map(VideoFrame::byte_count).sum());
        if self.video_bytes - replaced + bytes > self.video_max_bytes {
            return false;
        }
        self.video_bytes = self.video_bytes - replaced + bytes;
        self.video.insert(frame, frames);
        true
    }

    pub fn contains_audio(&self, seconds: i64) -> bool {
        self.audio.lock().contains_key(&seconds)
    }

    /// Insert a bucket, subject to the budget like [`FrameCache::insert_video`]
    pub fn insert_audio(&mut self, seconds: i64, frame: AudioFrame) -> bool {
        let bytes = frame.byte_count();
        let mut audio = self.audio.lock();
        let replaced = audio.get(&seconds).map_or(0, AudioFrame::byte_count);
        if self.audio_bytes - replaced + bytes > self.audio_max_bytes {
            return false;
        }
        self.audio_bytes = self.audio_bytes - replaced + bytes;
        audio.insert(seconds, frame);
        true
    }

    /// Drop video frames outside the window; returns how many were dropped
    pub fn evict_video(&mut self, window: &[RangeInclusive<i64>]) -> usize {
        let before = self.video.len();
        let mut freed = 0;
        self.video.retain(|key, frames| {
            let keep = window.iter().any(|r| r.contains(key));
            if !keep {
                freed += frames.iter().map(VideoFrame::byte_count).sum::<usize>();
            }
            keep
        });
        self.video_bytes -= freed;
        before - self.video.len()
    }

    /// Drop audio buckets outside the window; returns how many were dropped
    pub fn evict_audio(&mut self, window: &[RangeInclusive<i64>]) -> usize {
        let mut audio = self.audio.lock();
        let before = audio.len();
        let mut freed = 0;
        audio.retain(|key, frame| {
            let keep = window.iter().any(|r| r.contains(key));
            if !keep {
                freed += frame.byte_count();
            }
            keep
        });
        self.audio_bytes -= freed;
        before - audio.len()
    }

    pub fn clear(&mut self) {
        self.video.clear();
        self.video_bytes = 0;
        self.audio.lock().clear();
        self.audio_bytes = 0;
    }

    /// Summarize the cache for observers
    pub fn cache_info(&self, rate: f64) -> PlayerCacheInfo {
        let video_times = self
            .video
            .keys()
            .map(|k| RationalTime::new(*k as f64, rate))
            .collect();
        let audio_times = self
            .audio
            .lock()
            .keys()
            .map(|s| RationalTime::new(*s as f64, 1.0))
            .collect();
        let audio = to_ranges(audio_times)
            .into_iter()
            .map(|r| TimeRange::new(r.start_time().rescaled_to(rate), r.duration().rescaled_to(rate)))
            .collect();
        PlayerCacheInfo {
            video_percentage: percentage(self.video_bytes, self.video_max_bytes),
            audio_percentage: percentage(self.audio_bytes, self.audio_max_bytes),
            video: to_ranges(video_times),
            audio,
            video_bytes: self.video_bytes,
            audio_bytes: self.audio_bytes,
        }
    }
}

fn percentage(bytes: usize, max: usize) -> f32 {
    if max > 0 {
        (bytes as f64 / max as f64 * 100.0) as f32
    } else {
        0.0
    }
}

/// Frames or seconds ahead and behind, fitted into `max` units
fn window_extent(ahead: f64, behind: f64, max: i64) -> (i64, i64) {
    let ahead = (ahead.ceil().max(0.0) as i64).min(max - 1);
    let behind = (behind.ceil().max(0.0) as i64).min(max - 1 - ahead);
    (ahead, behind)
}

fn place_window(
    current: i64,
    dir: CacheDir,
    ahead: i64,
    behind: i64,
    bounds: RangeInclusive<i64>,
    wrap: bool,
) -> Vec<RangeInclusive<i64>> {
    let (start, end) = match dir {
        CacheDir::Forward => (current.saturating_sub(behind), current.saturating_add(ahead)),
        CacheDir::Reverse => (current.saturating_sub(ahead), current.saturating_add(behind)),
    };
    if wrap {
        loop_seconds_range(start..=end, bounds)
    } else {
        let (start, end) = (start.max(*bounds.start()), end.min(*bounds.end()));
        if start <= end {
            vec![start..=end]
        } else {
            Vec::new()
        }
    }
}

/// Frames to keep cached around `current`, at the rate of `bounds`
///
/// `frame_bytes` is the size of one cached key across all sources; the
/// window shrinks so the budget holds it. The read-ahead and read-behind
/// are split evenly between `source_count` active sources. Playing forward
/// the read-ahead extends after the current frame, in reverse before it.
/// With `wrap` the window loops around `bounds`, otherwise it is clipped to
/// them. A zero
/// budget yields an empty window.
pub fn video_window(
    current: RationalTime,
    dir: CacheDir,
    options: &PlayerCacheOptions,
    bounds: &TimeRange,
    wrap: bool,
    frame_bytes: usize,
    source_count: usize,
) -> Vec<RangeInclusive<i64>> {
    let max_bytes = options.video_max_bytes();
    if max_bytes == 0 || bounds.is_empty() {
        return Vec::new();
    }
    let max_frames = if frame_bytes > 0 { (max_bytes / frame_bytes) as i64 } else { i64::MAX };
    if max_frames <= 0 {
        return Vec::new();
    }

    let rate = bounds.duration().rate();
    let share = source_count.max(1) as f64;
    let (ahead, behind) = window_extent(
        options.read_ahead / share * rate,
        options.read_behind / share * rate,
        max_frames,
    );
    let bounds = bounds.start_time().rescaled_to(rate).frame()
        ..=bounds.end_time_inclusive().rescaled_to(rate).frame();
    place_window(current.rescaled_to(rate).frame(), dir, ahead, behind, bounds, wrap)
}

/// Seconds of audio to keep cached around `current_seconds`
///
/// Same rules as [`video_window`], in whole seconds.
pub fn audio_window(
    current_seconds: i64,
    dir: CacheDir,
    options: &PlayerCacheOptions,
    bounds: RangeInclusive<i64>,
    wrap: bool,
    second_bytes: usize,
    source_count: usize,
) -> Vec<RangeInclusive<i64>> {
    let max_bytes = options.audio_max_bytes();
    if max_bytes == 0 || bounds.is_empty() {
        return Vec::new();
    }
    let max_seconds = if second_bytes > 0 { (max_bytes / second_bytes) as i64 } else { i64::MAX };
    if max_seconds <= 0 {
        return Vec::new();
    }

    let share = source_count.max(1) as f64;
    let (ahead, behind) = window_extent(options.read_ahead / share, options.read_behind / share, max_seconds);
    place_window(current_seconds, dir, ahead, behind, bounds, wrap)
}

/// Keys of a window ordered by distance from `current` in the fill direction
///
/// Keys behind the current time sort last.
pub fn priority_order(
    window: &[RangeInclusive<i64>],
    current: i64,
    dir: CacheDir,
    bounds: &RangeInclusive<i64>,
) -> Vec<i64> {
    let len = (bounds.end() - bounds.start() + 1).max(1);
    let mut keys: Vec<i64> = window.iter().flat_map(|r| r.clone()).collect();
    keys.sort_by_key(|k| match dir {
        CacheDir::Forward => (k - current).rem_euclid(len),
        CacheDir::Reverse => (current - k).rem_euclid(len),
    });
    keys.dedup();
    keys
}
