//! Frame cache module for the timeline player
//!
//! Decoded video frames and one-second audio buckets are cached around the
//! current time, inside a byte budget, and filled by a request scheduler that
//! keeps a bounded number of reads in flight.

pub mod frame_cache;
pub mod scheduler;

pub use frame_cache::{audio_window, video_window, AudioCache, FrameCache};
pub use scheduler::{RequestScheduler, VideoSource, VideoSources};

use crate::time::TimeRange;
use serde::{Deserialize, Serialize};

/// Bytes in a gigabyte, as used for the cache budgets
pub const GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Cache budget and window options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerCacheOptions {
    /// Video cache budget in gigabytes
    pub video_gb: f64,

    /// Audio cache budget in gigabytes
    pub audio_gb: f64,

    /// Seconds cached ahead of the current time, in playback direction
    pub read_ahead: f64,

    /// Seconds cached behind the current time
    pub read_behind: f64,
}

impl Default for PlayerCacheOptions {
    fn default() -> Self {
        Self {
            video_gb: 4.0,
            audio_gb: 0.5,
            read_ahead: 2.0,
            read_behind: 0.5,
        }
    }
}

impl PlayerCacheOptions {
    pub fn video_max_bytes(&self) -> usize {
        budget_bytes(self.video_gb)
    }

    pub fn audio_max_bytes(&self) -> usize {
        budget_bytes(self.audio_gb)
    }
}

fn budget_bytes(gb: f64) -> usize {
    if gb.is_finite() && gb > 0.0 {
        (gb * GIGABYTE) as usize
    } else {
        0
    }
}

/// What is cached, published to observers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCacheInfo {
    /// Video cache fill, 0 to 100
    pub video_percentage: f32,

    /// Audio cache fill, 0 to 100
    pub audio_percentage: f32,

    /// Cached video, as contiguous ranges at the timeline rate
    pub video: Vec<TimeRange>,

    /// Cached audio, as contiguous ranges at the timeline rate
    pub audio: Vec<TimeRange>,

    pub video_bytes: usize,
    pub audio_bytes: usize,
}
