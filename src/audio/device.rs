//! Audio device selection
//!
//! Output devices are identified by name, which is what cpal exposes as a
//! stable identifier. `Disabled` skips audio entirely and makes the player
//! use the wall clock.

use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

/// Which output device the player opens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioDeviceId {
    /// Never open an output device
    Disabled,

    /// The host's default output device
    #[default]
    Default,

    /// A device by name
    Named(String),
}

/// Audio device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Device name, also its identifier
    pub name: String,

    /// Whether this is the default device
    pub is_default: bool,

    /// Supported sample rates
    pub sample_rates: Vec<u32>,

    /// Maximum channels
    pub max_channels: u16,
}

/// Enumerate all audio output devices
pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.output_devices().audio_err("Failed to enumerate devices")? {
        let Ok(name) = device.name() else {
            continue;
        };

        let mut sample_rates = Vec::new();
        let mut max_channels = 0u16;
        if let Ok(configs) = device.supported_output_configs() {
            for config in configs {
                for &rate in &[44100, 48000, 96000, 192000] {
                    let range = config.min_sample_rate().0..=config.max_sample_rate().0;
                    if range.contains(&rate) && !sample_rates.contains(&rate) {
                        sample_rates.push(rate);
                    }
                }
                max_channels = max_channels.max(config.channels());
            }
        }
        sample_rates.sort_unstable();

        devices.push(AudioDeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
            sample_rates,
            max_channels,
        });
    }

    Ok(devices)
}

/// Resolve a device id to a cpal device
///
/// Returns `Ok(None)` for `Disabled`.
pub(crate) fn find_output_device(id: &AudioDeviceId) -> Result<Option<cpal::Device>> {
    let host = cpal::default_host();
    match id {
        AudioDeviceId::Disabled => Ok(None),
        AudioDeviceId::Default => host
            .default_output_device()
            .map(Some)
            .ok_or_else(|| PlayerError::Audio("No default output device found".to_string())),
        AudioDeviceId::Named(name) => {
            let mut devices = host.output_devices().audio_err("Failed to enumerate devices")?;
            devices
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .map(Some)
                .ok_or_else(|| PlayerError::Audio(format!("Device not found: {}", name)))
        }
    }
}
