//! Compare modes
//!
//! A player can show a primary timeline next to compare timelines. This
//! module maps primary time onto compare timelines and lays out the
//! per-source boxes the render collaborator composites into.

use super::video::{Size, VideoFrame};
use crate::time::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};

/// How the sources are composited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compare {
    #[default]
    A,
    B,
    Wipe,
    Overlay,
    Difference,
    Horizontal,
    Vertical,
    Tile,
}

/// How primary time maps onto a compare timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareTime {
    /// Offset from each timeline's start
    #[default]
    Relative,

    /// Same absolute time on every timeline
    Absolute,
}

/// Compare options handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub compare: Compare,

    /// Wipe center in normalized coordinates
    pub wipe_center: (f32, f32),

    /// Wipe rotation in degrees
    pub wipe_rotation: f32,

    /// Overlay opacity of B over A
    pub overlay: f32,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare: Compare::A,
            wipe_center: (0.5, 0.5),
            wipe_rotation: 0.0,
            overlay: 0.5,
        }
    }
}

/// An axis aligned box in render pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Box2 {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Box2 {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }
}

/// Map a primary time onto a compare timeline
pub fn get_compare_time(
    source_time: RationalTime,
    source_range: &TimeRange,
    compare_range: &TimeRange,
    compare_time: CompareTime,
) -> RationalTime {
    let rate = compare_range.duration().rate();
    match compare_time {
        CompareTime::Absolute => source_time.rescaled_to(rate),
        CompareTime::Relative => {
            let relative = (source_time - source_range.start_time()).rescaled_to(rate).floor();
            compare_range.start_time().rescaled_to(rate) + relative
        }
    }
}

/// Lay out one box per source
///
/// Side-by-side modes tile the sources using the first source's size; the
/// overlapping modes place every source over the first.
pub fn get_boxes(compare: Compare, sizes: &[Size]) -> Vec<Box2> {
    let Some(first) = sizes.first().copied() else {
        return Vec::new();
    };
    let count = sizes.len();
    match compare {
        Compare::A | Compare::B | Compare::Wipe | Compare::Overlay | Compare::Difference => {
            (0..count).map(|_| Box2::new(0, 0, first.width, first.height)).collect()
        }
        Compare::Horizontal => (0..count)
            .map(|i| Box2::new(i * first.width, 0, first.width, first.height))
            .collect(),
        Compare::Vertical => (0..count)
            .map(|i| Box2::new(0, i * first.height, first.width, first.height))
            .collect(),
        Compare::Tile => {
            let columns = (count as f64).sqrt().ceil() as usize;
            (0..count)
                .map(|i| {
                    let (row, column) = (i / columns, i % columns);
                    Box2::new(column * first.width, row * first.height, first.width, first.height)
                })
                .collect()
        }
    }
}

/// Size of the area covering every box
pub fn get_render_size(compare: Compare, sizes: &[Size]) -> Size {
    get_boxes(compare, sizes)
        .iter()
        .fold(Size::default(), |size, b| Size {
            width: size.width.max(b.x + b.width),
            height: size.height.max(b.y + b.height),
        })
}

/// Everything the render collaborator needs for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    /// One frame per source, primary first
    pub video: Vec<VideoFrame>,
    pub compare_options: CompareOptions,
    pub boxes: Vec<Box2>,
    pub render_size: Size,
}

impl RenderData {
    pub fn new(video: Vec<VideoFrame>, compare_options: CompareOptions) -> Self {
        let sizes: Vec<Size> = video.iter().map(|v| v.size).collect();
        Self {
            boxes: get_boxes(compare_options.compare, &sizes),
            render_size: get_render_size(compare_options.compare, &sizes),
            video,
            compare_options,
        }
    }
}
