//! Audio engine
//!
//! Runs inside the device callback. Each callback copies the audio state out
//! from under the audio mutex, pulls one-second buckets from the audio cache,
//! and mixes, reverses, speed-changes and resamples them into a ring buffer
//! the device output is served from. It never touches the general player
//! mutex, and all scratch buffers are reused between callbacks.

use super::state::{AudioState, Shared};
use super::Playback;
use crate::audio::{change_speed_into, mix_into, reverse_in_place, Audio, AudioInfo, AudioResample};
use crate::timeline::audio_copy_into;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on chunks rendered in one callback
const MAX_CHUNKS: usize = 256;

/// Seconds of output the ring buffer holds
const RING_SECONDS: usize = 2;

pub(crate) struct AudioEngine {
    shared: Arc<Shared>,
    input: AudioInfo,
    output: AudioInfo,

    /// Timeline frame rate; speed is relative to it
    rate: f64,

    /// Input sample frames rendered per chunk
    chunk: usize,

    state: AudioState,
    resample: AudioResample,
    ring: HeapRb<f32>,
    layers: Vec<Audio>,
    mixed: Audio,
    changed: Audio,
    resampled: Vec<f32>,
    input_frame: i64,
    output_frame: i64,
}

impl AudioEngine {
    pub fn new(shared: Arc<Shared>, input: AudioInfo, output: AudioInfo, rate: f64, buffer_frames: usize) -> Self {
        let chunk = if output.sample_rate > 0 {
            (buffer_frames * input.sample_rate / output.sample_rate).max(1)
        } else {
            buffer_frames.max(1)
        };
        let capacity = (output.sample_rate * output.channel_count * RING_SECONDS).max(1);
        log::debug!("Audio engine: {} frame chunks, {} sample ring", chunk, capacity);
        Self {
            shared,
            input,
            output,
            rate,
            chunk,
            state: AudioState::default(),
            resample: AudioResample::new(input, output),
            ring: HeapRb::new(capacity),
            layers: Vec::new(),
            mixed: Audio::new(input, chunk),
            changed: Audio::new(input, chunk),
            resampled: Vec::with_capacity(capacity),
            input_frame: 0,
            output_frame: 0,
        }
    }

    /// Fill one device buffer of interleaved f32 samples
    pub fn process(&mut self, data: &mut [f32]) {
        data.fill(0.0);

        let (reset, start) = {
            let mut audio = self.shared.audio.lock();
            self.state.copy_from(&audio.state);
            (std::mem::take(&mut audio.reset), audio.start)
        };
        if reset {
            self.input_frame = 0;
            self.output_frame = 0;
            self.resample.reset();
            self.ring.clear();
        }
        if self.state.playback == Playback::Stop || !self.input.is_valid() {
            return;
        }

        let reverse = self.state.playback == Playback::Reverse;
        let volume = self.state.effective_volume(Instant::now());
        let start_frame =
            ((start.to_seconds() - self.state.audio_offset) * self.input.sample_rate as f64).floor() as i64;
        let target = (data.len() * 2).min(self.ring.capacity().get());
        let mut chunks = 0;
        while self.ring.occupied_len() < target && chunks < MAX_CHUNKS {
            self.render_chunk(start_frame, reverse, volume);
            chunks += 1;
        }

        // Missing samples stay silent.
        self.ring.pop_slice(data);

        let channels = self.output.channel_count.max(1);
        self.output_frame += (data.len() / channels) as i64;
        let frame = (self.output_frame as f64 * self.state.speed / self.rate) as i64;
        let mut audio = self.shared.audio.lock();
        if !audio.reset {
            audio.frame = frame;
        }
    }

    fn render_chunk(&mut self, start_frame: i64, reverse: bool, volume: f32) {
        let position = if reverse {
            start_frame - self.input_frame
        } else {
            start_frame + self.input_frame
        };
        let layers = {
            let cache = self.shared.audio_cache.lock();
            audio_copy_into(&self.input, &cache, position, self.chunk, reverse, &mut self.layers).0
        };

        self.mixed.reset(self.input, self.chunk);
        mix_into(&self.layers[..layers], volume, &self.state.channel_mute, &mut self.mixed);
        if reverse {
            reverse_in_place(&mut self.mixed);
        }

        self.resampled.clear();
        if self.state.speed > 0.0 && self.state.speed != self.rate {
            change_speed_into(&self.mixed, self.rate / self.state.speed, &mut self.changed);
            self.resample.process_into(&self.changed, &mut self.resampled);
        } else {
            self.resample.process_into(&self.mixed, &mut self.resampled);
        }

        // Whole frames only, so channels stay aligned.
        let channels = self.output.channel_count.max(1);
        let free = self.ring.vacant_len() / channels * channels;
        let count = self.resampled.len().min(free);
        self.ring.push_slice(&self.resampled[..count]);
        self.input_frame += self.chunk as i64;
    }
}
