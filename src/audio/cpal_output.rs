//! CPAL audio output
//!
//! Opens an f32 output stream on the selected device and drives a caller
//! supplied render callback from the device thread. The callback is built
//! after the device format is negotiated, so it can size its buffers and
//! resampler for the real output format.

use super::device::{find_output_device, AudioDeviceId};
use super::{AudioInfo, AudioType};
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig, SupportedBufferSize};

/// An open output stream
///
/// Dropping the value stops the stream.
pub struct AudioOutput {
    stream: Stream,
    info: AudioInfo,
    device_name: String,
}

impl AudioOutput {
    /// Open the device and start the stream
    ///
    /// `make_callback` receives the negotiated output format and returns the
    /// render callback, which fills interleaved f32 samples.
    pub fn open<M, F>(device: &AudioDeviceId, buffer_frames: usize, make_callback: M) -> Result<Self>
    where
        M: FnOnce(AudioInfo) -> F,
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let device = find_output_device(device)?
            .ok_or_else(|| PlayerError::Audio("Audio output is disabled".to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_output_config()
            .audio_err("Failed to query output config")?;
        // Not every backend honors a fixed buffer size.
        let buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&(buffer_frames as u32)) => {
                BufferSize::Fixed(buffer_frames as u32)
            }
            _ => BufferSize::Default,
        };
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };
        let info = AudioInfo::new(
            config.channels as usize,
            AudioType::F32,
            config.sample_rate.0 as usize,
        );

        let mut callback = make_callback(info);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback(data),
                |err: cpal::StreamError| log::error!("Audio stream error: {}", err),
                None,
            )
            .audio_err("Failed to create audio stream")?;
        stream.play().audio_err("Failed to start audio stream")?;

        log::info!(
            "Audio output opened: {} ({} channels, {} Hz)",
            device_name,
            info.channel_count,
            info.sample_rate
        );
        Ok(Self {
            stream,
            info,
            device_name,
        })
    }

    /// The negotiated output format
    pub fn info(&self) -> &AudioInfo {
        &self.info
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn pause(&self) -> Result<()> {
        self.stream.pause().audio_err("Failed to pause audio stream")
    }

    pub fn resume(&self) -> Result<()> {
        self.stream.play().audio_err("Failed to resume audio stream")
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        log::debug!("Closing audio output: {}", self.device_name);
    }
}
