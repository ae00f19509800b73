//! Timeline playback core
//!
//! Plays an opened [`Timeline`]: keeps a byte-bounded cache of decoded
//! video frames and one-second audio buckets filled around the current
//! time, mixes and resamples audio into an output device, and keeps several
//! players in step when one follows another.
//!
//! The crate logs through the `log` facade; install whichever logger the
//! host application uses.

pub mod audio;
pub mod cache;
pub mod player;
pub mod time;
pub mod timeline;
pub mod utils;

pub use cache::{PlayerCacheInfo, PlayerCacheOptions};
pub use player::{
    CompareLink, Loop, Playback, Player, PlayerOptions, TimeAction, TimeSource, TimerMode,
};
pub use time::{CacheDir, RationalTime, TimeRange};
pub use timeline::{AudioFrame, IoInfo, IoOptions, ReadSystem, Timeline, VideoFrame};
pub use utils::{Config, PlayerError, Result};
