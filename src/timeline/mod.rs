//! Timeline read interface for the timeline player
//!
//! The player does not decode anything itself. It talks to a [`Timeline`]
//! (an opened, composited timeline) that answers video and audio reads
//! asynchronously: each read returns a request id and a one-shot future the
//! decode thread polls without blocking.

pub mod audio;
pub mod compare;
pub mod video;

pub use audio::{audio_copy_into, AudioFrame, AudioLayer};
pub use compare::{
    get_boxes, get_compare_time, get_render_size, Box2, Compare, CompareOptions, CompareTime,
    RenderData,
};
pub use video::{
    AlphaBlend, Image, ImageInfo, ImageOptions, PixelType, Size, Transition, VideoFrame,
    VideoLayer, VideoLevels,
};

use crate::audio::AudioInfo;
use crate::time::{RationalTime, TimeRange};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Reader options, passed through to the timeline untouched
///
/// The player sets [`LAYER_OPTION`] to the selected video layer.
pub type IoOptions = BTreeMap<String, String>;

/// Option key carrying the video layer index
pub const LAYER_OPTION: &str = "Layer";

/// Stream information of an opened timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoInfo {
    /// One entry per video layer
    pub video: Vec<ImageInfo>,

    /// Audio stream, invalid when there is no audio
    pub audio: AudioInfo,
}

impl IoInfo {
    pub fn has_video(&self) -> bool {
        !self.video.is_empty()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_valid()
    }
}

/// Completion of a video read
pub type VideoFuture = oneshot::Receiver<Result<VideoFrame>>;

/// Completion of an audio read
pub type AudioFuture = oneshot::Receiver<Result<AudioFrame>>;

/// An in-flight video read
#[derive(Debug)]
pub struct VideoRequest {
    pub id: u64,
    pub future: VideoFuture,
}

/// An in-flight audio read
#[derive(Debug)]
pub struct AudioRequest {
    pub id: u64,
    pub future: AudioFuture,
}

impl VideoRequest {
    /// A request that has already completed
    pub fn ready(id: u64, result: Result<VideoFrame>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { id, future: rx }
    }
}

impl AudioRequest {
    /// A request that has already completed
    pub fn ready(id: u64, result: Result<AudioFrame>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { id, future: rx }
    }
}

/// An opened timeline the player reads from
pub trait Timeline: Send + Sync {
    /// The playable range; its rate is the timeline frame rate
    fn time_range(&self) -> TimeRange;

    /// Stream information
    fn io_info(&self) -> IoInfo;

    /// Read the composited video at `time`
    ///
    /// # Arguments
    ///
    /// * `time` - Frame time at the timeline rate
    /// * `options` - Reader options, including the video layer
    fn read_video(&self, time: RationalTime, options: &IoOptions) -> VideoRequest;

    /// Read the mixed audio layers for `range`
    ///
    /// The player always asks for one whole second starting on a second
    /// boundary, in seconds (rate 1).
    fn read_audio(&self, range: TimeRange, options: &IoOptions) -> AudioRequest;

    /// Cancel in-flight reads
    ///
    /// Cancelled requests may still complete; the player discards them.
    fn cancel_requests(&self, _ids: &[u64]) {}
}

/// Opens timelines from paths
pub trait ReadSystem: Send + Sync {
    fn open(&self, path: &Path, options: &IoOptions) -> Result<Arc<dyn Timeline>>;
}
