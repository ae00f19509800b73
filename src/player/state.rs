//! Player state shared between threads
//!
//! Two locks: the general mutex guards the playback state and what the
//! decode thread publishes back to the control thread; the audio mutex
//! guards only the small state the audio callback snapshots. The audio
//! cache has its own lock inside [`AudioCache`].

use super::{Loop, Playback};
use crate::cache::{AudioCache, PlayerCacheInfo, PlayerCacheOptions};
use crate::time::{CacheDir, RationalTime, TimeRange};
use crate::timeline::{AudioFrame, CompareTime, IoOptions, Timeline, VideoFrame, LAYER_OPTION};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Playback state as seen by the decode thread
#[derive(Clone)]
pub(crate) struct PlaybackState {
    pub playback: Playback,
    pub current_time: RationalTime,
    pub in_out_range: TimeRange,
    pub loop_mode: Loop,
    pub speed: f64,
    pub video_layer: usize,
    pub compare_video_layers: Vec<usize>,

    /// Seconds the audio is shifted by
    pub audio_offset: f64,

    pub cache_options: PlayerCacheOptions,
    pub io_options: IoOptions,
    pub compare: Vec<Arc<dyn Timeline>>,
    pub compare_time: CompareTime,
}

impl PlaybackState {
    /// Reader options for a source, with its video layer set
    pub fn source_options(&self, index: usize) -> IoOptions {
        let layer = if index == 0 {
            self.video_layer
        } else {
            self.compare_video_layers.get(index - 1).copied().unwrap_or(self.video_layer)
        };
        let mut options = self.io_options.clone();
        options.insert(LAYER_OPTION.to_string(), layer.to_string());
        options
    }
}

/// Data behind the general mutex
pub(crate) struct MutexData {
    pub state: PlaybackState,

    /// Requests in flight are no longer wanted
    pub clear_requests: bool,

    /// Everything cached is no longer valid
    pub clear_cache: bool,

    /// Bumped when the video sources change
    pub sources_generation: u64,

    pub cache_dir: CacheDir,

    /// Frames around the current time, published by the decode thread
    pub video_frames: BTreeMap<i64, Vec<VideoFrame>>,
    pub current_audio: Vec<AudioFrame>,
    pub cache_info: PlayerCacheInfo,
}

/// What the audio callback needs; copied out on every callback
#[derive(Debug, Clone, Default)]
pub(crate) struct AudioState {
    pub playback: Playback,
    pub speed: f64,
    pub volume: f32,
    pub mute: bool,
    pub channel_mute: Vec<bool>,
    pub audio_offset: f64,
    pub mute_timeout: Option<Instant>,
}

impl AudioState {
    /// Copy without reallocating the channel mute list
    pub fn copy_from(&mut self, other: &AudioState) {
        self.playback = other.playback;
        self.speed = other.speed;
        self.volume = other.volume;
        self.mute = other.mute;
        self.channel_mute.clear();
        self.channel_mute.extend_from_slice(&other.channel_mute);
        self.audio_offset = other.audio_offset;
        self.mute_timeout = other.mute_timeout;
    }

    /// Output volume right now
    pub fn effective_volume(&self, now: Instant) -> f32 {
        let muted = self.mute || self.mute_timeout.is_some_and(|t| now < t);
        if muted {
            0.0
        } else {
            self.volume
        }
    }
}

/// Data behind the audio mutex
#[derive(Debug)]
pub(crate) struct AudioMutexData {
    pub state: AudioState,

    /// Set by the control thread, taken by the callback
    pub reset: bool,

    /// Timeline time the callback starts reading from after a reset
    pub start: RationalTime,

    /// Played output frames scaled by speed, written by the callback
    pub frame: i64,
}

/// Everything the control, decode and audio threads share
pub(crate) struct Shared {
    pub mutex: Mutex<MutexData>,
    pub audio: Mutex<AudioMutexData>,
    pub audio_cache: AudioCache,
    pub stop: AtomicBool,
}

impl Shared {
    pub fn new(state: PlaybackState, audio: AudioState) -> Arc<Self> {
        let audio = AudioMutexData {
            start: state.current_time,
            state: audio,
            reset: false,
            frame: 0,
        };
        Arc::new(Self {
            mutex: Mutex::new(MutexData {
                state,
                clear_requests: false,
                clear_cache: false,
                sources_generation: 0,
                cache_dir: CacheDir::Forward,
                video_frames: BTreeMap::new(),
                current_audio: Vec::new(),
                cache_info: PlayerCacheInfo::default(),
            }),
            audio: Mutex::new(audio),
            audio_cache: AudioCache::default(),
            stop: AtomicBool::new(false),
        })
    }
}
