//! Streaming audio resampler
//!
//! Channels are remapped to the output layout first, then converted to the
//! output rate with rubato's FFT resampler. Input is queued per channel and
//! handed over in the fixed chunk size the resampler asks for, so a stream
//! can be fed in arbitrary chunk sizes. Equal rates skip the resampler.

use super::dsp::convert_audio;
use super::{Audio, AudioInfo, AudioType, Sample, SampleData};
use rubato::{FftFixedIn, Resampler};

/// Input frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// FFT sub-chunks per input chunk
const SUB_CHUNKS: usize = 2;

/// Resampler between an input and an output format
pub struct AudioResample {
    input: AudioInfo,
    output: AudioInfo,

    /// `None` when the rates match
    resampler: Option<FftFixedIn<f32>>,

    /// Remapped input waiting for a full chunk, one buffer per output channel
    pending: Vec<Vec<f32>>,

    wave_in: Vec<Vec<f32>>,
    wave_out: Vec<Vec<f32>>,

    /// Output frames still to drop for the resampler delay
    delay: usize,
}

impl AudioResample {
    pub fn new(input: AudioInfo, output: AudioInfo) -> Self {
        let channels = output.channel_count;
        let resampler = if input.sample_rate != output.sample_rate
            && input.sample_rate > 0
            && output.sample_rate > 0
            && channels > 0
        {
            match FftFixedIn::<f32>::new(input.sample_rate, output.sample_rate, CHUNK_FRAMES, SUB_CHUNKS, channels) {
                Ok(resampler) => Some(resampler),
                Err(err) => {
                    log::error!("Failed to create audio resampler: {}", err);
                    None
                }
            }
        } else {
            None
        };
        let (in_frames, out_frames, delay) = resampler.as_ref().map_or((0, 0, 0), |r| {
            (r.input_frames_max(), r.output_frames_max(), r.output_delay())
        });
        log::debug!(
            "Audio resample: {}ch {:?} {}Hz -> {}ch {:?} {}Hz, {} frame chunks",
            input.channel_count,
            input.audio_type,
            input.sample_rate,
            output.channel_count,
            output.audio_type,
            output.sample_rate,
            in_frames
        );
        Self {
            input,
            output,
            resampler,
            pending: (0..channels).map(|_| Vec::with_capacity(2 * in_frames)).collect(),
            wave_in: vec![vec![0.0; in_frames]; channels],
            wave_out: vec![vec![0.0; out_frames]; channels],
            delay,
        }
    }

    pub fn input_info(&self) -> &AudioInfo {
        &self.input
    }

    pub fn output_info(&self) -> &AudioInfo {
        &self.output
    }

    /// Resample a chunk into a new buffer of the output format
    pub fn process(&mut self, input: &Audio) -> Audio {
        let mut samples = Vec::new();
        self.process_into(input, &mut samples);
        self.to_output(samples)
    }

    /// Resample a chunk, appending interleaved f32 output samples to `out`
    ///
    /// Output lags the input by up to one resampler chunk. Does not allocate
    /// once the queues have grown to the largest chunk size seen.
    pub fn process_into(&mut self, input: &Audio, out: &mut Vec<f32>) {
        if input.info().is_valid() && *input.info() != self.input {
            *self = Self::new(*input.info(), self.output);
        }
        let in_channels = input.info().channel_count;
        if in_channels == 0 || self.output.channel_count == 0 || input.sample_count() == 0 {
            return;
        }
        match input.data() {
            SampleData::None => {}
            SampleData::S8(v) => self.push_typed(v, in_channels, out),
            SampleData::S16(v) => self.push_typed(v, in_channels, out),
            SampleData::S32(v) => self.push_typed(v, in_channels, out),
            SampleData::F32(v) => self.push_typed(v, in_channels, out),
            SampleData::F64(v) => self.push_typed(v, in_channels, out),
        }
        self.drain_chunks(out);
    }

    /// Resample whatever input is still queued and reset the stream
    pub fn flush(&mut self) -> Audio {
        let mut samples = Vec::new();
        let pending = self.pending.first().map_or(0, Vec::len);
        if let (Some(resampler), true) = (self.resampler.as_mut(), pending > 0) {
            let partial: Vec<&[f32]> = self.pending.iter().map(Vec::as_slice).collect();
            match resampler.process_partial_into_buffer(Some(partial.as_slice()), &mut self.wave_out, None) {
                Ok((_, produced)) => {
                    // The rest of the chunk is zero padding.
                    let real = (pending * self.output.sample_rate).div_ceil(self.input.sample_rate);
                    let frames = produced.min(self.delay + real);
                    interleave(&self.wave_out, frames, &mut self.delay, &mut samples);
                }
                Err(err) => log::warn!("Audio resample flush failed: {}", err),
            }
        }
        self.reset();
        self.to_output(samples)
    }

    /// Forget any stream state without producing output
    pub fn reset(&mut self) {
        for pending in &mut self.pending {
            pending.clear();
        }
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
            self.delay = resampler.output_delay();
        }
    }

    fn push_typed<T: Sample>(&mut self, samples: &[T], in_channels: usize, out: &mut Vec<f32>) {
        let out_channels = self.output.channel_count;
        if self.resampler.is_none() {
            for frame in samples.chunks_exact(in_channels) {
                for channel in 0..out_channels {
                    out.push(map_channel(frame, channel, out_channels));
                }
            }
            return;
        }
        for frame in samples.chunks_exact(in_channels) {
            for (channel, pending) in self.pending.iter_mut().enumerate() {
                pending.push(map_channel(frame, channel, out_channels));
            }
        }
    }

    fn drain_chunks(&mut self, out: &mut Vec<f32>) {
        let Some(resampler) = self.resampler.as_mut() else {
            return;
        };
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.first().map_or(0, Vec::len) < needed {
                break;
            }
            for (wave, pending) in self.wave_in.iter_mut().zip(self.pending.iter_mut()) {
                wave[..needed].copy_from_slice(&pending[..needed]);
                pending.drain(..needed);
            }
            match resampler.process_into_buffer(&self.wave_in, &mut self.wave_out, None) {
                Ok((_, produced)) => interleave(&self.wave_out, produced, &mut self.delay, out),
                Err(err) => log::warn!("Audio resample failed: {}", err),
            }
        }
    }

    fn to_output(&self, samples: Vec<f32>) -> Audio {
        let audio = Audio::from_samples(self.output.channel_count, self.output.sample_rate, samples);
        if self.output.audio_type == AudioType::F32 {
            audio
        } else {
            convert_audio(&audio, self.output.audio_type)
                .unwrap_or_else(|| Audio::new(self.output, 0))
        }
    }
}

/// Append the first `frames` of planar `wave` to `out`, dropping `skip` first
fn interleave(wave: &[Vec<f32>], frames: usize, skip: &mut usize, out: &mut Vec<f32>) {
    let start = (*skip).min(frames);
    *skip -= start;
    for index in start..frames {
        for channel in wave {
            out.push(channel[index]);
        }
    }
}

/// Pick or derive the sample for an output channel from an input frame
fn map_channel<T: Sample>(frame: &[T], channel: usize, out_channels: usize) -> f32 {
    if frame.len() == 1 {
        frame[0].to_f32()
    } else if out_channels == 1 {
        frame.iter().map(|s| s.to_f32()).sum::<f32>() / frame.len() as f32
    } else {
        frame[channel.min(frame.len() - 1)].to_f32()
    }
}
