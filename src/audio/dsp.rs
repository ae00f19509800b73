//! Audio DSP helpers
//!
//! Mixing, reversal, speed change and sample type conversion. The `_into`
//! and `_in_place` variants write into caller-owned buffers and are what the
//! audio callback uses; the allocating variants wrap them.

use super::{Audio, AudioInfo, AudioType, Sample, SampleData};

/// Total sample frames in a list of buffers
pub fn sample_count(audio: &[Audio]) -> usize {
    audio.iter().map(|a| a.sample_count()).sum()
}

/// Mix layers into a new buffer
///
/// The output takes the info of the first layer and the shortest layer's
/// length. Layers of a different format are ignored.
pub fn mix_audio(inputs: &[Audio], volume: f32, channel_mute: &[bool]) -> Option<Audio> {
    let first = inputs.first()?;
    let info = *first.info();
    let count = inputs
        .iter()
        .filter(|a| *a.info() == info)
        .map(|a| a.sample_count())
        .min()
        .unwrap_or(0);
    let mut out = Audio::new(info, count);
    mix_into(inputs, volume, channel_mute, &mut out);
    Some(out)
}

/// Mix layers into `out`, which must already be sized
///
/// Each sample is scaled by `volume`, or zero for a muted channel. Integer
/// samples are saturated per layer and after summing; float samples are
/// summed directly.
pub fn mix_into(inputs: &[Audio], volume: f32, channel_mute: &[bool], out: &mut Audio) {
    match out.info().audio_type {
        AudioType::None => {}
        AudioType::S8 => mix_typed::<i8>(inputs, volume, channel_mute, out),
        AudioType::S16 => mix_typed::<i16>(inputs, volume, channel_mute, out),
        AudioType::S32 => mix_typed::<i32>(inputs, volume, channel_mute, out),
        AudioType::F32 => mix_typed::<f32>(inputs, volume, channel_mute, out),
        AudioType::F64 => mix_typed::<f64>(inputs, volume, channel_mute, out),
    }
}

fn mix_typed<T: Sample>(inputs: &[Audio], volume: f32, channel_mute: &[bool], out: &mut Audio) {
    let info = *out.info();
    let channels = info.channel_count.max(1);
    let Some(out_samples) = T::slice_mut(out.data_mut()) else {
        return;
    };
    for (i, sample) in out_samples.iter_mut().enumerate() {
        let muted = channel_mute.get(i % channels).copied().unwrap_or(false);
        let layer_volume = if muted { 0.0 } else { volume };
        *sample = T::mix(
            inputs
                .iter()
                .filter(|a| *a.info() == info)
                .filter_map(|a| a.samples::<T>().and_then(|s| s.get(i).copied())),
            layer_volume,
        );
    }
}

/// Reverse the order of sample frames, keeping channel order within a frame
pub fn reverse_in_place(audio: &mut Audio) {
    let channels = audio.info().channel_count;
    match audio.data_mut() {
        SampleData::None => {}
        SampleData::S8(v) => reverse_frames(v, channels),
        SampleData::S16(v) => reverse_frames(v, channels),
        SampleData::S32(v) => reverse_frames(v, channels),
        SampleData::F32(v) => reverse_frames(v, channels),
        SampleData::F64(v) => reverse_frames(v, channels),
    }
}

fn reverse_frames<T>(samples: &mut [T], channels: usize) {
    if channels == 0 {
        return;
    }
    samples.reverse();
    for frame in samples.chunks_exact_mut(channels) {
        frame.reverse();
    }
}

pub fn reverse_audio(audio: &Audio) -> Audio {
    let mut out = audio.clone();
    reverse_in_place(&mut out);
    out
}

/// Change the length of a buffer by `mult` using nearest-neighbor sampling
///
/// A multiplier below one shortens the buffer (faster playback).
pub fn change_speed_into(input: &Audio, mult: f64, out: &mut Audio) {
    let info = *input.info();
    let in_count = input.sample_count();
    let out_count = if mult > 0.0 { (in_count as f64 * mult) as usize } else { 0 };
    out.reset(info, out_count);
    if in_count == 0 {
        return;
    }
    for i in 0..out_count {
        let j = if out_count > 1 {
            (i as f64 / (out_count - 1) as f64 * (in_count - 1) as f64) as usize
        } else {
            0
        };
        out.copy_frames_from(i, input, j.min(in_count - 1), 1);
    }
}

pub fn change_audio_speed(input: &Audio, mult: f64) -> Audio {
    let mut out = Audio::default();
    change_speed_into(input, mult, &mut out);
    out
}

/// Convert a buffer to another sample type
///
/// Returns `None` when either type is `AudioType::None`.
pub fn convert_audio(input: &Audio, audio_type: AudioType) -> Option<Audio> {
    let info = *input.info();
    if info.audio_type == AudioType::None || audio_type == AudioType::None {
        return None;
    }
    if info.audio_type == audio_type {
        return Some(input.clone());
    }
    let data = match input.data() {
        SampleData::None => return None,
        SampleData::S8(v) => convert_from(v, audio_type),
        SampleData::S16(v) => convert_from(v, audio_type),
        SampleData::S32(v) => convert_from(v, audio_type),
        SampleData::F32(v) => convert_from(v, audio_type),
        SampleData::F64(v) => convert_from(v, audio_type),
    };
    Some(Audio::from_data(
        AudioInfo::new(info.channel_count, audio_type, info.sample_rate),
        input.sample_count(),
        data,
    ))
}

fn convert_from<A: Sample>(samples: &[A], audio_type: AudioType) -> SampleData {
    fn collect<A: Sample, B: Sample>(samples: &[A]) -> SampleData {
        B::wrap(samples.iter().map(|s| s.convert::<B>()).collect())
    }
    match audio_type {
        AudioType::None => SampleData::None,
        AudioType::S8 => collect::<A, i8>(samples),
        AudioType::S16 => collect::<A, i16>(samples),
        AudioType::S32 => collect::<A, i32>(samples),
        AudioType::F32 => collect::<A, f32>(samples),
        AudioType::F64 => collect::<A, f64>(samples),
    }
}
