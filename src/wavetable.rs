//! Single-period waveform tables and the kinds the factory can build.

use core::ops::Deref;

use crate::error::SynthError;

/// Sample rate every synthesizer instance renders at, in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Number of samples in one period of every generated table.
pub const WAVETABLE_LENGTH: usize = 1 << 8;

/// The periodic waveforms the factory knows how to build.
///
/// Discriminants match the integer encoding used across the host boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum WavetableKind {
    Sine = 0,
    Triangle = 1,
    Square = 2,
    Saw = 3,
}

impl WavetableKind {
    pub const ALL: [WavetableKind; 4] = [
        WavetableKind::Sine,
        WavetableKind::Triangle,
        WavetableKind::Square,
        WavetableKind::Saw,
    ];

    /// Decode the host's integer encoding. Returns `None` for unknown values.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(WavetableKind::Sine),
            1 => Some(WavetableKind::Triangle),
            2 => Some(WavetableKind::Square),
            3 => Some(WavetableKind::Saw),
            _ => None,
        }
    }

    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            WavetableKind::Sine => "sine",
            WavetableKind::Triangle => "triangle",
            WavetableKind::Square => "square",
            WavetableKind::Saw => "saw",
        }
    }
}

impl TryFrom<i32> for WavetableKind {
    type Error = SynthError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        WavetableKind::from_raw(raw).ok_or(SynthError::UnknownWavetable(raw))
    }
}

/// One period of a waveform, immutable once built.
///
/// Tables are shared read-only between the factory cache and oscillators
/// through `Arc<WaveTable>`.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveTable {
    samples: Box<[f32]>,
}

impl WaveTable {
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    /// An all-zero table of `len` samples.
    pub fn silent(len: usize) -> Self {
        Self::from_samples(vec![0.0; len])
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Linearly interpolated lookup at a fractional table position.
    ///
    /// `phase` is expected in `[0, len)`; the upper neighbour wraps to index 0.
    #[inline]
    pub fn interpolate(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        if len == 0 {
            return 0.0;
        }

        let index = phase as usize;
        let frac = phase - index as f32;
        let index = index % len;

        let a = self.samples[index];
        let b = self.samples[(index + 1) % len];

        a + frac * (b - a)
    }
}

impl Deref for WaveTable {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_encoding_round_trips() {
        for kind in WavetableKind::ALL {
            assert_eq!(WavetableKind::from_raw(kind.as_raw()), Some(kind));
        }
        assert_eq!(WavetableKind::from_raw(4), None);
        assert_eq!(WavetableKind::from_raw(-1), None);
        assert!(matches!(
            WavetableKind::try_from(7),
            Err(SynthError::UnknownWavetable(7))
        ));
    }

    #[test]
    fn interpolation_is_linear_between_neighbours() {
        let table = WaveTable::from_samples(vec![0.0, 1.0, 0.0, -1.0]);

        assert_eq!(table.interpolate(0.0), 0.0);
        assert_eq!(table.interpolate(1.0), 1.0);
        assert!((table.interpolate(0.5) - 0.5).abs() < 1e-6);
        assert!((table.interpolate(2.25) - -0.25).abs() < 1e-6);
    }

    #[test]
    fn interpolation_wraps_last_sample_to_first() {
        let table = WaveTable::from_samples(vec![1.0, 0.0, 0.0, -1.0]);
        // halfway between table[3] = -1 and table[0] = 1
        assert!(table.interpolate(3.5).abs() < 1e-6);
    }

    #[test]
    fn silent_table_is_all_zero() {
        let table = WaveTable::silent(WAVETABLE_LENGTH);
        assert_eq!(table.len(), WAVETABLE_LENGTH);
        assert!(table.iter().all(|&s| s == 0.0));
        assert_eq!(table.interpolate(17.3), 0.0);
    }
}
