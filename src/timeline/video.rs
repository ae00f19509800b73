//! Video frame data
//!
//! Decoded images are reference counted so a frame can sit in the cache,
//! the published current-frame list and the render hand-off at once.

use crate::time::RationalTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel layout of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelType {
    #[default]
    None,
    LU8,
    RgbU8,
    RgbaU8,
    RgbaF16,
    RgbaF32,
    Yuv420pU8,
}

impl PixelType {
    /// Bytes for a `width` x `height` image
    pub fn byte_count(&self, width: usize, height: usize) -> usize {
        let pixels = width * height;
        match self {
            Self::None => 0,
            Self::LU8 => pixels,
            Self::RgbU8 => pixels * 3,
            Self::RgbaU8 => pixels * 4,
            Self::RgbaF16 => pixels * 8,
            Self::RgbaF32 => pixels * 16,
            Self::Yuv420pU8 => pixels + 2 * (width / 2) * (height / 2),
        }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Image description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageInfo {
    pub size: Size,
    pub pixel_type: PixelType,
}

impl ImageInfo {
    pub fn new(width: usize, height: usize, pixel_type: PixelType) -> Self {
        Self {
            size: Size::new(width, height),
            pixel_type,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.size.is_valid() && self.pixel_type != PixelType::None
    }

    pub fn byte_count(&self) -> usize {
        self.pixel_type.byte_count(self.size.width, self.size.height)
    }
}

/// A decoded image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    info: ImageInfo,
    data: Vec<u8>,
}

impl Image {
    /// Create a zeroed image
    pub fn new(info: ImageInfo) -> Self {
        Self {
            info,
            data: vec![0; info.byte_count()],
        }
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn byte_count(&self) -> usize {
        self.data.len()
    }
}

/// Video range of the source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoLevels {
    #[default]
    FullRange,
    LegalRange,
}

/// How the alpha channel is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaBlend {
    None,
    #[default]
    Straight,
    Premultiplied,
}

/// Per-image options carried through to rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageOptions {
    pub video_levels: VideoLevels,
    pub alpha_blend: AlphaBlend,
}

/// Transition between two clips on a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    None,
    Dissolve,
}

/// One composited layer of a video frame
#[derive(Debug, Clone, Default)]
pub struct VideoLayer {
    pub image: Option<Arc<Image>>,
    pub image_options: ImageOptions,

    /// Second image during a transition
    pub image_b: Option<Arc<Image>>,
    pub image_options_b: ImageOptions,

    pub transition: Transition,

    /// Transition progress from 0 to 1
    pub transition_value: f32,
}

impl VideoLayer {
    pub fn byte_count(&self) -> usize {
        self.image.as_ref().map_or(0, |i| i.byte_count())
            + self.image_b.as_ref().map_or(0, |i| i.byte_count())
    }
}

fn same_image(a: &Option<Arc<Image>>, b: &Option<Arc<Image>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for VideoLayer {
    fn eq(&self, other: &Self) -> bool {
        same_image(&self.image, &other.image)
            && same_image(&self.image_b, &other.image_b)
            && self.image_options == other.image_options
            && self.image_options_b == other.image_options_b
            && self.transition == other.transition
            && self.transition_value == other.transition_value
    }
}

/// The composited video for one time of one source
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Render size of the frame
    pub size: Size,

    /// Time of the frame on its timeline
    pub time: RationalTime,

    pub layers: Vec<VideoLayer>,
}

impl VideoFrame {
    pub fn new(size: Size, time: RationalTime, layers: Vec<VideoLayer>) -> Self {
        Self { size, time, layers }
    }

    pub fn byte_count(&self) -> usize {
        self.layers.iter().map(VideoLayer::byte_count).sum()
    }
}
