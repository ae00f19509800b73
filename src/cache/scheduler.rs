//! Request scheduler
//!
//! Issues reads for uncached keys inside the cache window, keeping at most
//! one request per key and a bounded number in flight. Completions are
//! polled without blocking and moved into the [`FrameCache`]. Clearing
//! moves in-flight requests to a stale list; they are cancelled and their
//! results are thrown away when they land.

use super::frame_cache::FrameCache;
use crate::time::{RationalTime, TimeRange};
use crate::timeline::{
    get_compare_time, AudioRequest, CompareTime, IoOptions, Timeline, VideoFrame, VideoRequest,
};
use crate::utils::error::{PlayerError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::oneshot::error::TryRecvError;

/// A timeline video is read from
#[derive(Clone)]
pub struct VideoSource {
    pub timeline: Arc<dyn Timeline>,
    pub options: IoOptions,
    pub time_range: TimeRange,

    /// Estimated bytes per decoded frame
    pub frame_bytes: usize,
}

impl VideoSource {
    pub fn new(timeline: Arc<dyn Timeline>, options: IoOptions, layer: usize) -> Self {
        let info = timeline.io_info();
        let frame_bytes = info
            .video
            .get(layer)
            .or_else(|| info.video.first())
            .map_or(0, |i| i.byte_count());
        Self {
            time_range: timeline.time_range(),
            timeline,
            options,
            frame_bytes,
        }
    }
}

/// The primary timeline followed by any compare timelines
#[derive(Clone)]
pub struct VideoSources {
    pub compare_time: CompareTime,
    pub sources: Vec<VideoSource>,
}

impl VideoSources {
    pub fn new(primary: VideoSource, compare: Vec<VideoSource>, compare_time: CompareTime) -> Self {
        let mut sources = Vec::with_capacity(1 + compare.len());
        sources.push(primary);
        sources.extend(compare);
        Self {
            compare_time,
            sources,
        }
    }

    pub fn primary(&self) -> &VideoSource {
        &self.sources[0]
    }

    /// Time to read from source `index` for a primary time
    pub fn source_time(&self, index: usize, time: RationalTime) -> RationalTime {
        if index == 0 {
            return time;
        }
        get_compare_time(
            time,
            &self.primary().time_range,
            &self.sources[index].time_range,
            self.compare_time,
        )
    }

    /// Estimated bytes of one cached key across all sources
    pub fn frame_bytes(&self) -> usize {
        self.sources.iter().map(|s| s.frame_bytes).sum()
    }

    /// Raise the estimate of source `index` to a frame it actually returned
    ///
    /// Readers may hand back frames larger than their declared format.
    /// Returns whether the estimate grew.
    pub fn observe_frame_bytes(&mut self, index: usize, bytes: usize) -> bool {
        match self.sources.get_mut(index) {
            Some(source) if bytes > source.frame_bytes => {
                log::debug!(
                    "Video source {} frame size estimate {} -> {} bytes",
                    index,
                    source.frame_bytes,
                    bytes
                );
                source.frame_bytes = bytes;
                true
            }
            _ => false,
        }
    }
}

struct PendingVideo {
    requests: Vec<VideoRequest>,
    frames: Vec<Option<VideoFrame>>,
}

enum Poll<T> {
    Pending,
    Ready(T),
}

impl PendingVideo {
    fn poll(&mut self) -> Poll<Result<Vec<VideoFrame>>> {
        let mut pending = false;
        for (request, slot) in self.requests.iter_mut().zip(self.frames.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            match request.future.try_recv() {
                Ok(Ok(frame)) => *slot = Some(frame),
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(TryRecvError::Empty) => pending = true,
                Err(TryRecvError::Closed) => {
                    return Poll::Ready(Err(PlayerError::read_error("video request dropped")));
                }
            }
        }
        if pending {
            Poll::Pending
        } else {
            Poll::Ready(Ok(self.frames.iter_mut().filter_map(Option::take).collect()))
        }
    }
}

/// Outstanding reads and their limits
pub struct RequestScheduler {
    video: BTreeMap<i64, PendingVideo>,
    audio: BTreeMap<i64, AudioRequest>,
    stale_video: Vec<VideoRequest>,
    stale_audio: Vec<AudioRequest>,
    video_request_count: usize,
    audio_request_count: usize,
}

impl RequestScheduler {
    pub fn new(video_request_count: usize, audio_request_count: usize) -> Self {
        Self {
            video: BTreeMap::new(),
            audio: BTreeMap::new(),
            stale_video: Vec::new(),
            stale_audio: Vec::new(),
            video_request_count,
            audio_request_count,
        }
    }

    pub fn video_in_flight(&self) -> usize {
        self.video.len()
    }

    pub fn audio_in_flight(&self) -> usize {
        self.audio.len()
    }

    /// Cleared requests whose results have not landed yet
    pub fn stale_count(&self) -> usize {
        self.stale_video.len() + self.stale_audio.len()
    }

    pub fn is_video_pending(&self, key: i64) -> bool {
        self.video.contains_key(&key)
    }

    /// Request uncached frames, in the order given
    ///
    /// Stops at the in-flight limit, or when the frames already cached plus
    /// those in flight would no longer fit the budget. Returns the number of
    /// keys requested.
    pub fn issue_video(&mut self, keys: &[i64], rate: f64, cache: &FrameCache, sources: &VideoSources) -> usize {
        let frame_bytes = sources.frame_bytes();
        let mut issued = 0;
        for &key in keys {
            if self.video.len() >= self.video_request_count {
                break;
            }
            if cache.contains_video(key) || self.video.contains_key(&key) {
                continue;
            }
            let projected = cache.video_bytes() + (self.video.len() + 1) * frame_bytes;
            if projected > cache.video_max_bytes() {
                break;
            }

            let time = RationalTime::new(key as f64, rate);
            let requests: Vec<VideoRequest> = sources
                .sources
                .iter()
                .enumerate()
                .map(|(i, source)| source.timeline.read_video(sources.source_time(i, time), &source.options))
                .collect();
            log::trace!("Video request: {}", time);
            let frames = requests.iter().map(|_| None).collect();
            self.video.insert(key, PendingVideo { requests, frames });
            issued += 1;
        }
        issued
    }

    /// Request uncached seconds of audio, in the order given
    pub fn issue_audio(
        &mut self,
        keys: &[i64],
        cache: &FrameCache,
        timeline: &dyn Timeline,
        options: &IoOptions,
        second_bytes: usize,
    ) -> usize {
        let mut issued = 0;
        for &seconds in keys {
            if self.audio.len() >= self.audio_request_count {
                break;
            }
            if self.audio.contains_key(&seconds) || cache.contains_audio(seconds) {
                continue;
            }
            let projected = cache.audio_bytes() + (self.audio.len() + 1) * second_bytes;
            if projected > cache.audio_max_bytes() {
                break;
            }

            let range = TimeRange::new(
                RationalTime::new(seconds as f64, 1.0),
                RationalTime::new(1.0, 1.0),
            );
            log::trace!("Audio request: {}", seconds);
            self.audio.insert(seconds, timeline.read_audio(range, options));
            issued += 1;
        }
        issued
    }

    /// Move finished video reads into the cache
    ///
    /// Failed reads are logged and dropped so the key is requested again.
    /// Frame sizes feed back into the per-source estimates, so a frame too
    /// large for the budget is not requested again until space frees up.
    /// Returns the number of keys cached.
    pub fn poll_video(&mut self, cache: &mut FrameCache, sources: &mut VideoSources) -> usize {
        let mut finished = Vec::new();
        for (key, pending) in self.video.iter_mut() {
            if let Poll::Ready(result) = pending.poll() {
                finished.push((*key, result));
            }
        }

        let mut cached = 0;
        for (key, result) in finished {
            self.video.remove(&key);
            match result {
                Ok(frames) => {
                    for (index, frame) in frames.iter().enumerate() {
                        sources.observe_frame_bytes(index, frame.byte_count());
                    }
                    if cache.insert_video(key, frames) {
                        cached += 1;
                    } else {
                        log::debug!("Video frame {} does not fit the cache budget", key);
                    }
                }
                Err(err) => log::warn!("Video read failed for frame {}: {}", key, err),
            }
        }
        cached
    }

    /// Move finished audio reads into the cache
    pub fn poll_audio(&mut self, cache: &mut FrameCache) -> usize {
        let mut finished = Vec::new();
        for (seconds, request) in self.audio.iter_mut() {
            match request.future.try_recv() {
                Ok(result) => finished.push((*seconds, result)),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    finished.push((*seconds, Err(PlayerError::read_error("audio request dropped"))));
                }
            }
        }

        let mut cached = 0;
        for (seconds, result) in finished {
            self.audio.remove(&seconds);
            match result {
                Ok(frame) => {
                    if cache.insert_audio(seconds, frame) {
                        cached += 1;
                    } else {
                        log::debug!("Audio second {} does not fit the cache budget", seconds);
                    }
                }
                Err(err) => log::warn!("Audio read failed for second {}: {}", seconds, err),
            }
        }
        cached
    }

    /// Cancel everything in flight and mark it stale
    pub fn clear_requests(&mut self, sources: &VideoSources) {
        let mut ids: Vec<Vec<u64>> = vec![Vec::new(); sources.sources.len()];
        for pending in std::mem::take(&mut self.video).into_values() {
            for (i, request) in pending.requests.into_iter().enumerate() {
                if let Some(ids) = ids.get_mut(i) {
                    ids.push(request.id);
                }
                self.stale_video.push(request);
            }
        }
        for request in std::mem::take(&mut self.audio).into_values() {
            ids[0].push(request.id);
            self.stale_audio.push(request);
        }

        for (source, ids) in sources.sources.iter().zip(ids.iter()) {
            if !ids.is_empty() {
                source.timeline.cancel_requests(ids);
            }
        }
        log::debug!("Cleared requests, {} stale", self.stale_count());
    }

    /// Drop stale requests that have finished; returns how many were dropped
    pub fn drain_stale(&mut self) -> usize {
        let before = self.stale_count();
        self.stale_video
            .retain_mut(|r| matches!(r.future.try_recv(), Err(TryRecvError::Empty)));
        self.stale_audio
            .retain_mut(|r| matches!(r.future.try_recv(), Err(TryRecvError::Empty)));
        before - self.stale_count()
    }
}
