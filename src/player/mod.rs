//! Player module for the timeline player
//!
//! The [`Player`] orchestrates playback of one timeline: a control-side
//! state machine driven by `tick`, a decode thread that keeps the frame
//! cache filled around the current time, and an audio engine running inside
//! the device callback. Players can be linked so one follows another's time.

mod audio;
mod controller;
mod state;
mod sync;
mod thread;

pub use crate::cache::{PlayerCacheInfo, PlayerCacheOptions};
pub use controller::Player;
pub use sync::{CompareLink, TimeSource};

use crate::audio::AudioDeviceId;
use crate::time::RationalTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Stop,
    Forward,
    Reverse,
}

/// What happens at the in/out boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Loop {
    #[default]
    Loop,
    Once,
    PingPong,
}

/// Discrete time jumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeAction {
    Start,
    End,
    FramePrev,
    FramePrevX10,
    FramePrevX100,
    FrameNext,
    FrameNextX10,
    FrameNextX100,
    JumpBack1s,
    JumpBack10s,
    JumpForward1s,
    JumpForward10s,
}

/// How playback time advances without an audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerMode {
    /// Elapsed wall time times speed; frames may be skipped
    #[default]
    System,

    /// At most one frame per tick
    Frame,
}

/// Player options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// Output device; `Disabled` always plays from the wall clock
    pub audio_device: AudioDeviceId,

    /// Video reads in flight at once
    pub video_request_count: usize,

    /// Audio reads in flight at once
    pub audio_request_count: usize,

    /// Device buffer size in sample frames
    pub audio_buffer_frame_count: usize,

    /// Silence after seeks and playback changes
    #[serde(with = "millis")]
    pub mute_timeout: Duration,

    /// Longest the decode thread waits between passes
    #[serde(with = "millis")]
    pub sleep_timeout: Duration,

    /// Start time instead of the timeline start
    #[serde(skip)]
    pub current_time: Option<RationalTime>,

    pub timer_mode: TimerMode,

    pub cache: PlayerCacheOptions,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            audio_device: AudioDeviceId::Default,
            video_request_count: 16,
            audio_request_count: 16,
            audio_buffer_frame_count: 500,
            mute_timeout: Duration::from_millis(500),
            sleep_timeout: Duration::from_millis(5),
            current_time: None,
            timer_mode: TimerMode::System,
            cache: PlayerCacheOptions::default(),
        }
    }
}

/// Durations as whole milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
