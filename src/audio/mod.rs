//! Audio module for the timeline player
//!
//! This module holds the audio data model (typed, interleaved sample
//! buffers), the DSP helpers the audio engine uses each callback, the
//! resampler, and cpal based device output.

pub mod cpal_output;
pub mod device;
pub mod dsp;
pub mod resample;

pub use cpal_output::AudioOutput;
pub use device::{list_devices, AudioDeviceId, AudioDeviceInfo};
pub use dsp::{
    change_audio_speed, change_speed_into, convert_audio, mix_audio, mix_into, reverse_audio,
    reverse_in_place, sample_count,
};
pub use resample::AudioResample;

use serde::{Deserialize, Serialize};

/// Audio sample type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioType {
    #[default]
    None,
    S8,
    S16,
    S32,
    F32,
    F64,
}

impl AudioType {
    /// Bytes per single-channel sample
    pub fn byte_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::S8 => 1,
            Self::S16 => 2,
            Self::S32 => 4,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Audio stream description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Number of interleaved channels
    pub channel_count: usize,

    /// Sample type
    pub audio_type: AudioType,

    /// Samples per second
    pub sample_rate: usize,
}

impl AudioInfo {
    pub fn new(channel_count: usize, audio_type: AudioType, sample_rate: usize) -> Self {
        Self {
            channel_count,
            audio_type,
            sample_rate,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.channel_count > 0 && self.audio_type != AudioType::None && self.sample_rate > 0
    }

    /// Bytes per multi-channel sample frame
    pub fn byte_count(&self) -> usize {
        self.channel_count * self.audio_type.byte_count()
    }
}

/// Interleaved sample storage, one variant per sample type
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SampleData {
    #[default]
    None,
    S8(Vec<i8>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleData {
    fn zeroed(audio_type: AudioType, len: usize) -> Self {
        match audio_type {
            AudioType::None => Self::None,
            AudioType::S8 => Self::S8(vec![0; len]),
            AudioType::S16 => Self::S16(vec![0; len]),
            AudioType::S32 => Self::S32(vec![0; len]),
            AudioType::F32 => Self::F32(vec![0.0; len]),
            AudioType::F64 => Self::F64(vec![0.0; len]),
        }
    }

    /// Number of single-channel samples
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::S8(v) => v.len(),
            Self::S16(v) => v.len(),
            Self::S32(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resize in place when the type matches, keeping the allocation
    fn reset(&mut self, audio_type: AudioType, len: usize) {
        match self {
            Self::S8(v) if audio_type == AudioType::S8 => reset_vec(v, len),
            Self::S16(v) if audio_type == AudioType::S16 => reset_vec(v, len),
            Self::S32(v) if audio_type == AudioType::S32 => reset_vec(v, len),
            Self::F32(v) if audio_type == AudioType::F32 => reset_vec(v, len),
            Self::F64(v) if audio_type == AudioType::F64 => reset_vec(v, len),
            _ => *self = Self::zeroed(audio_type, len),
        }
    }
}

fn reset_vec<T: Copy + Default>(v: &mut Vec<T>, len: usize) {
    v.clear();
    v.resize(len, T::default());
}

/// A buffer of interleaved audio
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Audio {
    info: AudioInfo,
    sample_count: usize,
    data: SampleData,
}

impl Audio {
    /// Create a zero-filled buffer holding `sample_count` sample frames
    pub fn new(info: AudioInfo, sample_count: usize) -> Self {
        Self {
            info,
            sample_count,
            data: SampleData::zeroed(info.audio_type, sample_count * info.channel_count),
        }
    }

    /// Wrap interleaved samples; a trailing partial frame is dropped
    pub fn from_samples<T: Sample>(channel_count: usize, sample_rate: usize, mut samples: Vec<T>) -> Self {
        let info = AudioInfo::new(channel_count, T::TYPE, sample_rate);
        let sample_count = if channel_count > 0 { samples.len() / channel_count } else { 0 };
        samples.truncate(sample_count * channel_count);
        Self {
            info,
            sample_count,
            data: T::wrap(samples),
        }
    }

    pub(crate) fn from_data(info: AudioInfo, sample_count: usize, data: SampleData) -> Self {
        Self {
            info,
            sample_count,
            data,
        }
    }

    pub fn info(&self) -> &AudioInfo {
        &self.info
    }

    /// Number of multi-channel sample frames
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn byte_count(&self) -> usize {
        self.sample_count * self.info.byte_count()
    }

    pub fn is_valid(&self) -> bool {
        self.info.is_valid()
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SampleData {
        &mut self.data
    }

    /// Typed view of the samples, if `T` matches the buffer type
    pub fn samples<T: Sample>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    pub fn samples_mut<T: Sample>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    pub fn zero(&mut self) {
        self.data.reset(self.info.audio_type, self.data.len());
    }

    /// Re-shape the buffer to `info` and `sample_count` zeroed frames
    ///
    /// The allocation is kept when the sample type is unchanged, so this
    /// does not allocate once capacity has been reached.
    pub fn reset(&mut self, info: AudioInfo, sample_count: usize) {
        self.info = info;
        self.sample_count = sample_count;
        self.data.reset(info.audio_type, sample_count * info.channel_count);
    }

    /// Copy `count` frames from `src` into this buffer
    ///
    /// Buffers must share a sample type and channel count; the copy is
    /// clamped to what both buffers hold. Returns the frames copied.
    pub fn copy_frames_from(&mut self, dst_frame: usize, src: &Audio, src_frame: usize, count: usize) -> usize {
        let channels = self.info.channel_count;
        if channels == 0 || src.info.channel_count != channels || src.info.audio_type != self.info.audio_type {
            return 0;
        }
        let count = count
            .min(self.sample_count.saturating_sub(dst_frame))
            .min(src.sample_count.saturating_sub(src_frame));
        if count == 0 {
            return 0;
        }
        let (d, s, n) = (dst_frame * channels, src_frame * channels, count * channels);
        match (&mut self.data, &src.data) {
            (SampleData::S8(d_v), SampleData::S8(s_v)) => d_v[d..d + n].copy_from_slice(&s_v[s..s + n]),
            (SampleData::S16(d_v), SampleData::S16(s_v)) => d_v[d..d + n].copy_from_slice(&s_v[s..s + n]),
            (SampleData::S32(d_v), SampleData::S32(s_v)) => d_v[d..d + n].copy_from_slice(&s_v[s..s + n]),
            (SampleData::F32(d_v), SampleData::F32(s_v)) => d_v[d..d + n].copy_from_slice(&s_v[s..s + n]),
            (SampleData::F64(d_v), SampleData::F64(s_v)) => d_v[d..d + n].copy_from_slice(&s_v[s..s + n]),
            _ => return 0,
        }
        count
    }
}

/// A sample type the DSP functions operate on
pub trait Sample: Copy + Default + PartialOrd + Send + Sync + 'static {
    const TYPE: AudioType;
    const IS_FLOAT: bool;

    fn slice(data: &SampleData) -> Option<&[Self]>;
    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]>;
    fn wrap(samples: Vec<Self>) -> SampleData;

    /// Normalized value, integers divided by their max
    fn to_f64(self) -> f64;

    /// From a normalized value, saturating for integers
    fn from_f64(value: f64) -> Self;

    /// Left-aligned 32-bit integer representation
    fn to_s32_bits(self) -> i32;
    fn from_s32_bits(value: i32) -> Self;

    /// Scale each input by `volume` and sum them with the type's overflow rules
    fn mix<I: Iterator<Item = Self>>(inputs: I, volume: f32) -> Self;

    fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// Convert to another sample type
    ///
    /// Integer to integer conversions shift; anything involving floats goes
    /// through the normalized value.
    fn convert<U: Sample>(self) -> U {
        if !Self::IS_FLOAT && !U::IS_FLOAT {
            U::from_s32_bits(self.to_s32_bits())
        } else {
            U::from_f64(self.to_f64())
        }
    }
}

macro_rules! impl_int_sample {
    ($t:ty, $variant:ident, $shift:expr) => {
        impl Sample for $t {
            const TYPE: AudioType = AudioType::$variant;
            const IS_FLOAT: bool = false;

            fn slice(data: &SampleData) -> Option<&[Self]> {
                match data {
                    SampleData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
                match data {
                    SampleData::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(samples: Vec<Self>) -> SampleData {
                SampleData::$variant(samples)
            }

            fn to_f64(self) -> f64 {
                self as f64 / <$t>::MAX as f64
            }

            fn from_f64(value: f64) -> Self {
                (value * <$t>::MAX as f64).clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t
            }

            fn to_s32_bits(self) -> i32 {
                (self as i32) << $shift
            }

            fn from_s32_bits(value: i32) -> Self {
                (value >> $shift) as $t
            }

            fn mix<I: Iterator<Item = Self>>(inputs: I, volume: f32) -> Self {
                let (min, max) = (<$t>::MIN as i64, <$t>::MAX as i64);
                let sum: i64 = inputs
                    .map(|s| ((s as f64 * volume as f64) as i64).clamp(min, max))
                    .sum();
                sum.clamp(min, max) as $t
            }
        }
    };
}

macro_rules! impl_float_sample {
    ($t:ty, $variant:ident) => {
        impl Sample for $t {
            const TYPE: AudioType = AudioType::$variant;
            const IS_FLOAT: bool = true;

            fn slice(data: &SampleData) -> Option<&[Self]> {
                match data {
                    SampleData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
                match data {
                    SampleData::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(samples: Vec<Self>) -> SampleData {
                SampleData::$variant(samples)
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn to_s32_bits(self) -> i32 {
                i32::from_f64(self as f64)
            }

            fn from_s32_bits(value: i32) -> Self {
                value.to_f64() as $t
            }

            fn mix<I: Iterator<Item = Self>>(inputs: I, volume: f32) -> Self {
                inputs.map(|s| s * volume as $t).sum()
            }
        }
    };
}

impl_int_sample!(i8, S8, 24);
impl_int_sample!(i16, S16, 16);
impl_int_sample!(i32, S32, 0);
impl_float_sample!(f32, F32);
impl_float_sample!(f64, F64);
