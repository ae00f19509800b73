//! Decode thread
//!
//! One per player. Each pass snapshots the playback state, applies pending
//! cache and request clears, recomputes the cache window, evicts and
//! requests, polls completions, and publishes the frames around the current
//! time back under the general mutex. Between passes it sleeps on the wake
//! channel so `tick` can start the next pass early.

use super::state::{PlaybackState, Shared};
use super::{Loop, PlayerOptions};
use crate::cache::{audio_window, video_window, FrameCache, RequestScheduler, VideoSource, VideoSources};
use crate::cache::frame_cache::priority_order;
use crate::time::{loop_seconds_range, CacheDir, TimeRange};
use crate::timeline::{AudioFrame, IoInfo, Timeline, VideoFrame};
use crate::utils::error::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Frames either side of the current time handed to the control thread
const PUBLISH_FRAMES: i64 = 12;

/// How often the cache summary is logged
const LOG_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) struct DecodeThread {
    shared: Arc<Shared>,
    timeline: Arc<dyn Timeline>,
    io_info: IoInfo,
    sleep_timeout: Duration,
    cache: FrameCache,
    scheduler: RequestScheduler,
    sources: VideoSources,
    sources_generation: u64,
    wake: Receiver<()>,
    last_log: Instant,
}

struct Snapshot {
    state: PlaybackState,
    clear_requests: bool,
    clear_cache: bool,
    sources_generation: u64,
    cache_dir: CacheDir,
}

impl DecodeThread {
    /// Start the thread
    pub fn spawn(
        shared: Arc<Shared>,
        timeline: Arc<dyn Timeline>,
        options: &PlayerOptions,
        wake: Receiver<()>,
    ) -> Result<JoinHandle<()>> {
        let (state, sources_generation) = {
            let mutex = shared.mutex.lock();
            (mutex.state.clone(), mutex.sources_generation)
        };
        let decode = Self {
            io_info: timeline.io_info(),
            sources: build_sources(&timeline, &state),
            cache: FrameCache::new(shared.audio_cache.clone(), &state.cache_options),
            scheduler: RequestScheduler::new(options.video_request_count, options.audio_request_count),
            sleep_timeout: options.sleep_timeout,
            sources_generation,
            shared,
            timeline,
            wake,
            last_log: Instant::now(),
        };
        let handle = thread::Builder::new()
            .name("timeline-player-decode".to_string())
            .spawn(move || decode.run())
            .map_err(|e| crate::internal_error!("Failed to spawn decode thread: {}", e))?;
        Ok(handle)
    }

    fn run(mut self) {
        log::debug!("Decode thread started");
        while !self.shared.stop.load(Ordering::Acquire) {
            self.pass();
            match self.wake.recv_timeout(self.sleep_timeout) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.scheduler.clear_requests(&self.sources);
        log::debug!("Decode thread finished");
    }

    fn pass(&mut self) {
        let snapshot = {
            let mut mutex = self.shared.mutex.lock();
            Snapshot {
                state: mutex.state.clone(),
                clear_requests: std::mem::take(&mut mutex.clear_requests),
                clear_cache: std::mem::take(&mut mutex.clear_cache),
                sources_generation: mutex.sources_generation,
                cache_dir: mutex.cache_dir,
            }
        };
        let state = &snapshot.state;

        if snapshot.sources_generation != self.sources_generation || snapshot.clear_cache {
            self.scheduler.clear_requests(&self.sources);
            self.cache.clear();
            if snapshot.sources_generation != self.sources_generation {
                self.sources = build_sources(&self.timeline, state);
                self.sources_generation = snapshot.sources_generation;
            }
            log::debug!("Cache cleared");
        } else if snapshot.clear_requests {
            self.scheduler.clear_requests(&self.sources);
        }
        self.cache.set_options(&state.cache_options);
        self.scheduler.drain_stale();

        self.scheduler.poll_video(&mut self.cache, &mut self.sources);
        self.scheduler.poll_audio(&mut self.cache);

        let wrap = state.loop_mode != Loop::Once;
        let bounds = state.in_out_range;
        let current = state.current_time.rescaled_to(bounds.duration().rate()).floor();
        let frame_bounds = frame_bounds(&bounds);

        if self.io_info.has_video() {
            let window = video_window(
                current,
                snapshot.cache_dir,
                &state.cache_options,
                &bounds,
                wrap,
                self.sources.frame_bytes(),
                self.sources.sources.len(),
            );
            self.cache.evict_video(&window);
            let keys = priority_order(&window, current.frame(), snapshot.cache_dir, &frame_bounds);
            self.scheduler
                .issue_video(&keys, bounds.duration().rate(), &self.cache, &self.sources);
        }

        let current_seconds = (current.to_seconds() - state.audio_offset).floor() as i64;
        if self.io_info.has_audio() {
            let audio = &self.io_info.audio;
            let second_bytes = audio.byte_count() * audio.sample_rate;
            let second_bounds = second_bounds(&bounds);
            let window = audio_window(
                current_seconds,
                snapshot.cache_dir,
                &state.cache_options,
                second_bounds.clone(),
                wrap,
                second_bytes,
                self.sources.sources.len(),
            );
            self.cache.evict_audio(&window);
            let keys = priority_order(&window, current_seconds, snapshot.cache_dir, &second_bounds);
            self.scheduler.issue_audio(
                &keys,
                &self.cache,
                self.timeline.as_ref(),
                &state.source_options(0),
                second_bytes,
            );
        }

        self.publish(current.frame(), current_seconds, &frame_bounds, wrap, bounds.duration().rate());
    }

    fn publish(&mut self, frame: i64, seconds: i64, frame_bounds: &RangeInclusive<i64>, wrap: bool, rate: f64) {
        let around = frame - PUBLISH_FRAMES..=frame + PUBLISH_FRAMES;
        let ranges = if wrap {
            loop_seconds_range(around, frame_bounds.clone())
        } else {
            vec![around]
        };
        let mut video_frames: BTreeMap<i64, Vec<VideoFrame>> = BTreeMap::new();
        for range in ranges {
            for (key, frames) in self.cache.video_range(range) {
                video_frames.insert(*key, frames.clone());
            }
        }

        let current_audio: Vec<AudioFrame> = {
            let audio = self.shared.audio_cache.lock();
            audio.get(&seconds).cloned().into_iter().collect()
        };
        let cache_info = self.cache.cache_info(rate);

        if self.last_log.elapsed() >= LOG_INTERVAL {
            log::debug!(
                "Cache: video {:.1}% ({} frames), audio {:.1}%, requests {}/{} in flight, {} stale",
                cache_info.video_percentage,
                self.cache.video_len(),
                cache_info.audio_percentage,
                self.scheduler.video_in_flight(),
                self.scheduler.audio_in_flight(),
                self.scheduler.stale_count()
            );
            self.last_log = Instant::now();
        }

        let mut mutex = self.shared.mutex.lock();
        mutex.video_frames = video_frames;
        mutex.current_audio = current_audio;
        mutex.cache_info = cache_info;
    }
}

/// The primary timeline plus compare timelines, with their layer options
fn build_sources(timeline: &Arc<dyn Timeline>, state: &PlaybackState) -> VideoSources {
    let primary = VideoSource::new(timeline.clone(), state.source_options(0), state.video_layer);
    let compare = state
        .compare
        .iter()
        .enumerate()
        .map(|(i, compare)| {
            let layer = state.compare_video_layers.get(i).copied().unwrap_or(state.video_layer);
            VideoSource::new(compare.clone(), state.source_options(i + 1), layer)
        })
        .collect();
    VideoSources::new(primary, compare, state.compare_time)
}

fn frame_bounds(range: &TimeRange) -> RangeInclusive<i64> {
    let rate = range.duration().rate();
    range.start_time().rescaled_to(rate).frame()..=range.end_time_inclusive().rescaled_to(rate).frame()
}

fn second_bounds(range: &TimeRange) -> RangeInclusive<i64> {
    range.start_time().to_seconds().floor() as i64..=range.end_time_inclusive().to_seconds().floor() as i64
}
