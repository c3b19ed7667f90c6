//! CPAL output device discovery and stream config negotiation.
//!
//! # Example: list devices
//!
//! ```no_run
//! use wavetable_synth::player::device::OutputDevice;
//!
//! for device in OutputDevice::list_outputs() {
//!     println!("{}", device.name());
//! }
//! ```

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SampleRate, SupportedBufferSize, SupportedStreamConfigRange};

use crate::error::PlayerError;

/// A discovered audio output device.
pub struct OutputDevice {
    device: cpal::Device,
    name: String,
}

/// The stream config picked for a device, plus the sample type to build it with.
#[derive(Clone, Debug)]
pub struct NegotiatedConfig {
    pub config: cpal::StreamConfig,
    pub sample_format: SampleFormat,
}

impl OutputDevice {
    /// Get the system's default output device.
    ///
    /// Returns `None` if no audio device is available.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        host.default_output_device().map(Self::from_device)
    }

    /// List all available audio output devices.
    ///
    /// Returns an empty list if enumeration fails.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.map(Self::from_device).collect())
            .unwrap_or_default()
    }

    fn from_device(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Self { device, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn device(&self) -> &cpal::Device {
        &self.device
    }

    /// Pick a config running at exactly `sample_rate`.
    ///
    /// Prefers `f32` samples, then the requested channel count. A fixed
    /// buffer of `buffer_frames` is requested when the device allows it.
    pub fn negotiate(
        &self,
        sample_rate: u32,
        channels: u16,
        buffer_frames: u32,
    ) -> Result<NegotiatedConfig, PlayerError> {
        let rate = SampleRate(sample_rate);

        let best = self
            .device
            .supported_output_configs()?
            .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .filter(|range| is_supported_format(range.sample_format()))
            .min_by_key(|range| rank(range, channels))
            .ok_or(PlayerError::UnsupportedSampleRate { sample_rate })?;

        let buffer_size = match best.buffer_size() {
            &SupportedBufferSize::Range { min, max } if (min..=max).contains(&buffer_frames) => {
                cpal::BufferSize::Fixed(buffer_frames)
            }
            _ => cpal::BufferSize::Default,
        };

        let sample_format = best.sample_format();
        let mut config = best.with_sample_rate(rate).config();
        config.buffer_size = buffer_size;

        Ok(NegotiatedConfig {
            config,
            sample_format,
        })
    }
}

fn is_supported_format(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::F32 | SampleFormat::F64 | SampleFormat::I16 | SampleFormat::U16 | SampleFormat::I32
    )
}

/// Lower is better.
fn rank(range: &SupportedStreamConfigRange, channels: u16) -> (bool, bool) {
    (
        range.sample_format() != SampleFormat::F32,
        range.channels() != channels,
    )
}
