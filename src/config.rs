//! Synthesizer configuration.

use core::ops::RangeInclusive;

use crate::error::SynthError;
use crate::wavetable::{WavetableKind, SAMPLE_RATE, WAVETABLE_LENGTH};

/// Fixed and initial parameters of one synthesizer instance.
///
/// The defaults match the host application: 48 kHz, 256-sample tables,
/// a 300 Hz sine at -24 dB.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizerConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Samples per wavetable period
    pub table_length: usize,
    /// Interleaved output channels; the mono signal is copied to each
    pub channels: u16,
    /// Frames per render callback the player asks for
    pub buffer_frames: u32,
    /// Frequencies outside this range are clamped before reaching the oscillator
    pub frequency_range: RangeInclusive<f32>,
    /// Volumes (dB) outside this range are clamped before conversion to gain
    pub volume_range_db: RangeInclusive<f32>,
    pub initial_frequency: f32,
    pub initial_volume_db: f32,
    pub initial_wavetable: WavetableKind,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            table_length: WAVETABLE_LENGTH,
            channels: 2,
            buffer_frames: 256,
            frequency_range: 1.0..=23_999.0,
            volume_range_db: -60.0..=0.0,
            initial_frequency: 300.0,
            initial_volume_db: -24.0,
            initial_wavetable: WavetableKind::Sine,
        }
    }
}

impl SynthesizerConfig {
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_frames = frames;
        self
    }

    pub fn with_frequency_range(mut self, range: RangeInclusive<f32>) -> Self {
        self.frequency_range = range;
        self
    }

    pub fn with_volume_range_db(mut self, range: RangeInclusive<f32>) -> Self {
        self.volume_range_db = range;
        self
    }

    pub fn with_initial_frequency(mut self, hz: f32) -> Self {
        self.initial_frequency = hz;
        self
    }

    pub fn with_initial_volume_db(mut self, db: f32) -> Self {
        self.initial_volume_db = db;
        self
    }

    pub fn with_initial_wavetable(mut self, kind: WavetableKind) -> Self {
        self.initial_wavetable = kind;
        self
    }

    /// Nyquist frequency for this config.
    #[inline]
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Duration of one render buffer, in seconds.
    #[inline]
    pub fn buffer_period_secs(&self) -> f64 {
        self.buffer_frames as f64 / self.sample_rate as f64
    }

    /// Clamp `hz` into the configured range. Returns `None` for NaN.
    pub fn clamp_frequency(&self, hz: f32) -> Option<f32> {
        clamp_to(hz, &self.frequency_range)
    }

    /// Clamp `db` into the configured range. Returns `None` for NaN.
    pub fn clamp_volume_db(&self, db: f32) -> Option<f32> {
        clamp_to(db, &self.volume_range_db)
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        let invalid = |msg: String| Err(SynthError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".into());
        }
        if self.table_length < 2 {
            return invalid(format!(
                "table length {} is shorter than 2 samples",
                self.table_length
            ));
        }
        if self.channels == 0 {
            return invalid("channel count must be positive".into());
        }
        if self.buffer_frames == 0 {
            return invalid("buffer size must be positive".into());
        }

        let (lo, hi) = (*self.frequency_range.start(), *self.frequency_range.end());
        if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || lo > hi {
            return invalid(format!("frequency range {lo}..={hi} is not a positive range"));
        }
        if hi >= self.nyquist() {
            return invalid(format!(
                "frequency ceiling {hi} Hz reaches Nyquist ({} Hz)",
                self.nyquist()
            ));
        }

        let (lo, hi) = (*self.volume_range_db.start(), *self.volume_range_db.end());
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return invalid(format!("volume range {lo}..={hi} dB is empty"));
        }

        if !self.initial_frequency.is_finite() || !self.initial_volume_db.is_finite() {
            return invalid("initial frequency and volume must be finite".into());
        }

        Ok(())
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(*range.start(), *range.end()))
}

/// Convert decibels to a linear gain multiplier.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
