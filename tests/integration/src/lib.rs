//! Integration test utilities for the timeline player
//!
//! This module provides:
//! - A mock timeline that answers reads immediately with generated frames
//! - Failure injection for video reads
//! - Polling helpers for waiting on the decode thread

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use timeline_player::audio::{Audio, AudioInfo, AudioType};
use timeline_player::timeline::{
    AudioLayer, AudioRequest, Image, ImageInfo, PixelType, VideoLayer, VideoRequest,
};
use timeline_player::{
    AudioFrame, IoInfo, IoOptions, PlayerError, RationalTime, ReadSystem, TimeRange, Timeline,
    VideoFrame,
};

/// Initialize test logging once
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Timeline answering every read immediately
pub struct MockTimeline {
    range: TimeRange,
    io_info: IoInfo,
    image: Arc<Image>,
    returned: Arc<Image>,
    next_id: AtomicU64,
    failing_frames: Mutex<HashSet<i64>>,
    video_reads: Mutex<Vec<RationalTime>>,
    audio_reads: AtomicUsize,
    cancelled: AtomicUsize,
}

impl MockTimeline {
    /// A video-only timeline of `seconds` at `rate`, with tiny RGBA frames
    pub fn video(rate: f64, seconds: f64) -> Arc<Self> {
        Self::with_io(rate, seconds, 16, 16, AudioInfo::default())
    }

    /// A timeline with video and mono float audio
    pub fn with_audio(rate: f64, seconds: f64, sample_rate: usize) -> Arc<Self> {
        Self::with_io(rate, seconds, 16, 16, AudioInfo::new(1, AudioType::F32, sample_rate))
    }

    pub fn with_io(rate: f64, seconds: f64, width: usize, height: usize, audio: AudioInfo) -> Arc<Self> {
        let info = ImageInfo::new(width, height, PixelType::RgbaU8);
        let image = Arc::new(Image::new(info));
        Arc::new(Self {
            range: TimeRange::new(RationalTime::new(0.0, rate), RationalTime::new(seconds * rate, rate)),
            io_info: IoInfo {
                video: vec![info],
                audio,
            },
            returned: image.clone(),
            image,
            next_id: AtomicU64::new(0),
            failing_frames: Mutex::new(HashSet::new()),
            video_reads: Mutex::new(Vec::new()),
            audio_reads: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        })
    }

    /// A video-only timeline declaring tiny frames but returning larger ones
    pub fn with_returned_size(rate: f64, seconds: f64, width: usize, height: usize) -> Arc<Self> {
        let mut timeline = Self::with_io(rate, seconds, 16, 16, AudioInfo::default());
        if let Some(timeline) = Arc::get_mut(&mut timeline) {
            timeline.returned = Arc::new(Image::new(ImageInfo::new(width, height, PixelType::RgbaU8)));
        }
        timeline
    }

    /// A timeline with nothing to play
    pub fn empty(rate: f64) -> Arc<Self> {
        Self::with_io(rate, 0.0, 16, 16, AudioInfo::default())
    }

    /// Bytes of one video frame, as declared
    pub fn frame_bytes(&self) -> usize {
        self.image.byte_count()
    }

    /// Bytes of one video frame, as returned by reads
    pub fn returned_frame_bytes(&self) -> usize {
        self.returned.byte_count()
    }

    /// Make reads of these frames fail
    pub fn fail_frames(&self, frames: impl IntoIterator<Item = i64>) {
        self.failing_frames.lock().extend(frames);
    }

    pub fn video_read_count(&self) -> usize {
        self.video_reads.lock().len()
    }

    /// How often a frame has been read
    pub fn reads_of(&self, frame: i64) -> usize {
        self.video_reads.lock().iter().filter(|t| t.frame() == frame).count()
    }

    pub fn audio_read_count(&self) -> usize {
        self.audio_reads.load(Ordering::Acquire)
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::Acquire)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Timeline for MockTimeline {
    fn time_range(&self) -> TimeRange {
        self.range
    }

    fn io_info(&self) -> IoInfo {
        self.io_info.clone()
    }

    fn read_video(&self, time: RationalTime, _options: &IoOptions) -> VideoRequest {
        self.video_reads.lock().push(time);
        let id = self.next_id();
        if self.failing_frames.lock().contains(&time.frame()) {
            return VideoRequest::ready(id, Err(PlayerError::Read(format!("frame {}", time.frame()))));
        }
        let layer = VideoLayer {
            image: Some(self.returned.clone()),
            ..Default::default()
        };
        let frame = VideoFrame::new(self.returned.info().size, time, vec![layer]);
        VideoRequest::ready(id, Ok(frame))
    }

    fn read_audio(&self, range: TimeRange, _options: &IoOptions) -> AudioRequest {
        self.audio_reads.fetch_add(1, Ordering::AcqRel);
        let id = self.next_id();
        let seconds = range.start_time().to_seconds().floor() as i64;
        let info = self.io_info.audio;
        let samples = vec![0.25f32; info.sample_rate * info.channel_count];
        let audio = Audio::from_samples(info.channel_count, info.sample_rate, samples);
        AudioRequest::ready(id, Ok(AudioFrame::new(seconds, vec![AudioLayer::new(audio)])))
    }

    fn cancel_requests(&self, ids: &[u64]) {
        self.cancelled.fetch_add(ids.len(), Ordering::AcqRel);
    }
}

/// Read system handing out one timeline for any path ending in `.otio`
pub struct MockReadSystem {
    pub timeline: Arc<MockTimeline>,
}

impl ReadSystem for MockReadSystem {
    fn open(&self, path: &Path, _options: &IoOptions) -> timeline_player::Result<Arc<dyn Timeline>> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("otio") => Ok(self.timeline.clone()),
            _ => Err(PlayerError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> Result<()> {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            bail!("timed out after {:?}", timeout);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    Ok(())
}
