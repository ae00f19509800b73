//! Audio frame data
//!
//! Audio is read and cached in one-second buckets keyed by whole seconds of
//! timeline time. Each bucket holds one buffer per audio layer.

use crate::audio::{Audio, AudioInfo};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One audio layer of a bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioLayer {
    pub audio: Option<Arc<Audio>>,
}

impl AudioLayer {
    pub fn new(audio: Audio) -> Self {
        Self {
            audio: Some(Arc::new(audio)),
        }
    }
}

/// One second of audio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFrame {
    /// Whole second of timeline time this bucket starts at
    pub seconds: i64,

    pub layers: Vec<AudioLayer>,
}

impl AudioFrame {
    pub fn new(seconds: i64, layers: Vec<AudioLayer>) -> Self {
        Self { seconds, layers }
    }

    pub fn byte_count(&self) -> usize {
        self.layers
            .iter()
            .filter_map(|l| l.audio.as_ref())
            .map(|a| a.byte_count())
            .sum()
    }
}

/// Copy a span of samples out of the cached buckets
///
/// `frame` is a sample position in the timeline's audio rate. Forward
/// playback copies `[frame, frame + size)`; reverse playback copies
/// `[frame - size, frame)`. The span may start in one bucket and spill into
/// the next. If the first bucket is missing nothing is copied; if the
/// second is missing the span is cut at the bucket end.
///
/// Buffers in `out` are reused (one per layer). Returns the number of layers
/// and sample frames filled.
pub fn audio_copy_into(
    info: &AudioInfo,
    cache: &BTreeMap<i64, AudioFrame>,
    frame: i64,
    size: usize,
    reverse: bool,
    out: &mut Vec<Audio>,
) -> (usize, usize) {
    let sample_rate = info.sample_rate as i64;
    if sample_rate <= 0 || size == 0 {
        return (0, 0);
    }

    let start = if reverse { frame - size as i64 } else { frame };
    let seconds = start.div_euclid(sample_rate);
    let offset = (start - seconds * sample_rate) as usize;
    let Some(first) = cache.get(&seconds) else {
        return (0, 0);
    };
    let second = cache.get(&(seconds + 1));

    let bucket_size = info.sample_rate;
    let mut count = size;
    if offset + count > bucket_size && second.is_none() {
        count = bucket_size - offset;
    }
    let first_count = count.min(bucket_size - offset);

    let layers = first.layers.len();
    while out.len() < layers {
        out.push(Audio::default());
    }
    for (i, layer) in first.layers.iter().enumerate() {
        let dst = &mut out[i];
        dst.reset(*info, count);
        let Some(audio) = layer.audio.as_ref().filter(|a| a.info() == info) else {
            continue;
        };
        dst.copy_frames_from(0, audio, offset, first_count);
        if first_count < count {
            let next = second
                .and_then(|f| f.layers.get(i))
                .and_then(|l| l.audio.as_ref())
                .filter(|a| a.info() == info);
            if let Some(next) = next {
                dst.copy_frames_from(first_count, next, 0, count - first_count);
            }
        }
    }
    (layers, count)
}
