//! Wavetable oscillator.
//!
//! A phase accumulator walks through the current [`WaveTable`] at
//! `frequency * table.len() / sample_rate` samples per frame, reading between
//! table entries with linear interpolation. The increment is rarely an
//! integer, so plain indexing would alias. It is derived from whichever table
//! is loaded when a render starts, so tables of any length play at pitch.
//!
//! Frequency, amplitude and phase are lock-free `AtomicCell<f32>` values and
//! the table sits in a [`TableSlot`], so every setter can be called from the
//! control thread while the render thread is inside [`Oscillator::render`].

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;

use crate::source::AudioSource;
use crate::table_slot::TableSlot;
use crate::wavetable::{WaveTable, SAMPLE_RATE};

pub struct Oscillator {
    sample_rate: u32,
    table: TableSlot,
    /// Position in the table, in samples. Written by the render thread.
    phase: AtomicCell<f32>,
    frequency: AtomicCell<f32>,
    amplitude: AtomicCell<f32>,
}

impl Oscillator {
    /// An oscillator at [`SAMPLE_RATE`] playing `table`, silent until a
    /// frequency is set.
    pub fn new(table: Arc<WaveTable>) -> Self {
        Self::with_sample_rate(table, SAMPLE_RATE)
    }

    pub fn with_sample_rate(table: Arc<WaveTable>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            table: TableSlot::new(table),
            phase: AtomicCell::new(0.0),
            frequency: AtomicCell::new(0.0),
            amplitude: AtomicCell::new(1.0),
        }
    }

    /// Set the playback frequency.
    ///
    /// `hz` is expected in `(0, sample_rate / 2)`; range checking is the
    /// caller's job and happens off the render path.
    pub fn set_frequency(&self, hz: f32) {
        self.frequency.store(hz);
    }

    /// Set the output gain as a linear multiplier.
    pub fn set_amplitude(&self, linear_gain: f32) {
        self.amplitude.store(linear_gain);
    }

    /// Swap in a new table. The previous table stays valid for any render
    /// already in progress and is released later on a control thread.
    pub fn set_wavetable(&self, table: Arc<WaveTable>) {
        self.table.swap(table);
    }

    /// Release tables retired by earlier swaps, if no render is in flight.
    /// Returns how many are still waiting.
    pub fn reclaim_retired(&self) -> usize {
        self.table.reclaim()
    }

    /// Restart the waveform from its first sample.
    pub fn reset_phase(&self) {
        self.phase.store(0.0);
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the table currently being played.
    pub fn table_length(&self) -> usize {
        self.table.load().len()
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency.load()
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude.load()
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase.load()
    }

    /// Table samples advanced per frame with the current table.
    pub fn phase_increment(&self) -> f32 {
        self.increment_for(self.table_length())
    }

    #[inline]
    fn increment_for(&self, table_length: usize) -> f32 {
        self.frequency.load() * table_length as f32 / self.sample_rate as f32
    }

    /// The table currently being played.
    pub fn wavetable(&self) -> Arc<WaveTable> {
        self.table.current()
    }

    /// Render `frame_count` samples into `output`.
    ///
    /// Real-time safe: atomic loads and stores only.
    pub fn render(&self, output: &mut [f32], frame_count: usize) {
        let table = self.table.load();
        let frames = frame_count.min(output.len());
        let output = &mut output[..frames];

        let len = table.len() as f32;
        if table.is_empty() {
            output.fill(0.0);
            return;
        }

        let increment = self.increment_for(table.len());
        let amplitude = self.amplitude.load();
        let mut phase = self.phase.load();
        if !phase.is_finite() || phase < 0.0 {
            phase = 0.0;
        } else if phase >= len {
            // a shorter table was swapped in since the last render
            phase %= len;
        }

        for sample in output.iter_mut() {
            *sample = table.interpolate(phase) * amplitude;

            phase += increment;
            if phase >= len {
                phase %= len;
            }
        }

        self.phase.store(phase);
    }
}

impl AudioSource for Oscillator {
    #[inline]
    fn render(&self, output: &mut [f32], frame_count: usize) {
        Oscillator::render(self, output, frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::WavetableFactory;
    use crate::wavetable::{WavetableKind, WAVETABLE_LENGTH};

    fn sine_oscillator() -> (WavetableFactory, Oscillator) {
        let mut factory = WavetableFactory::new();
        let osc = Oscillator::new(factory.get_wave_table(WavetableKind::Sine));
        (factory, osc)
    }

    /// Distance between two phases on the circle of length `len`.
    fn phase_distance(a: f32, b: f32, len: f32) -> f32 {
        let d = (a - b).rem_euclid(len);
        d.min(len - d)
    }

    #[test]
    fn atomics_are_lock_free() {
        assert!(AtomicCell::<f32>::is_lock_free());
    }

    #[test]
    fn increment_follows_frequency() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(440.0);

        let expected = 440.0 * WAVETABLE_LENGTH as f32 / SAMPLE_RATE as f32;
        assert!((osc.phase_increment() - expected).abs() < 1e-6);
        assert_eq!(osc.frequency(), 440.0);
    }

    #[test]
    fn one_period_of_frames_advances_phase_by_table_length() {
        let (_factory, osc) = sine_oscillator();
        let len = WAVETABLE_LENGTH as f32;

        // 375 Hz gives an increment of exactly 2.0
        osc.set_frequency(375.0);
        let frames = (SAMPLE_RATE as f32 / 375.0) as usize;
        let mut buffer = vec![0.0; frames];
        osc.render(&mut buffer, frames);
        assert_eq!(osc.phase(), 0.0);

        // 480 Hz: increment 2.56, one period is 100 frames
        osc.reset_phase();
        osc.set_frequency(480.0);
        let mut buffer = vec![0.0; 100];
        osc.render(&mut buffer, 100);
        assert!(phase_distance(osc.phase(), 0.0, len) < 5e-3);
    }

    #[test]
    fn phase_stays_in_table_range() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(7_919.0);

        let mut buffer = vec![0.0; 4096];
        for _ in 0..16 {
            osc.render(&mut buffer, 4096);
            let phase = osc.phase();
            assert!((0.0..WAVETABLE_LENGTH as f32).contains(&phase), "{phase}");
        }
    }

    #[test]
    fn render_tracks_the_sine_it_interpolates() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(440.0);

        let mut buffer = vec![0.0; 512];
        osc.render(&mut buffer, 512);

        let step = 2.0 * core::f32::consts::PI * 440.0 / SAMPLE_RATE as f32;
        for (i, &sample) in buffer.iter().enumerate() {
            let expected = (step * i as f32).sin();
            // linear interpolation error on a 256-point sine is ~7.5e-5
            assert!((sample - expected).abs() < 1e-3, "frame {i}: {sample} vs {expected}");
        }
    }

    #[test]
    fn amplitude_scales_output() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(1_000.0);

        let mut loud = vec![0.0; 256];
        osc.render(&mut loud, 256);

        osc.reset_phase();
        osc.set_amplitude(0.5);
        let mut quiet = vec![0.0; 256];
        osc.render(&mut quiet, 256);

        for (l, q) in loud.iter().zip(&quiet) {
            assert!((l * 0.5 - q).abs() < 1e-6);
        }
    }

    #[test]
    fn render_respects_frame_count_and_buffer_length() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(1_000.0);

        let mut buffer = vec![9.0; 64];
        osc.render(&mut buffer, 16);
        assert!(buffer[16..].iter().all(|&s| s == 9.0));

        let mut short = vec![0.0; 8];
        osc.render(&mut short, 1024);
    }

    #[test]
    fn swapping_tables_changes_the_waveform() {
        let mut factory = WavetableFactory::new();
        let osc = Oscillator::new(factory.get_wave_table(WavetableKind::Sine));
        osc.set_frequency(375.0);

        let square = factory.get_wave_table(WavetableKind::Square);
        osc.set_wavetable(Arc::clone(&square));
        assert!(Arc::ptr_eq(&osc.wavetable(), &square));
        assert_eq!(osc.reclaim_retired(), 0);

        let mut buffer = vec![0.0; 4];
        osc.render(&mut buffer, 4);
        // increment is 2.0, so frames land on even table entries
        for (i, &sample) in buffer.iter().enumerate() {
            assert_eq!(sample, square[2 * i]);
        }
    }

    #[test]
    fn shorter_table_keeps_the_pitch() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(375.0);

        let mut short = WavetableFactory::with_length(64);
        osc.set_wavetable(short.get_wave_table(WavetableKind::Sine));
        osc.reset_phase();
        assert_eq!(osc.table_length(), 64);
        assert_eq!(osc.phase_increment(), 0.5);

        // one period at 375 Hz is 128 frames
        let mut buffer = vec![0.0; 128];
        osc.render(&mut buffer, 128);
        assert_eq!(osc.phase(), 0.0);

        let step = 2.0 * core::f32::consts::PI * 375.0 / SAMPLE_RATE as f32;
        for (i, &sample) in buffer.iter().enumerate() {
            let expected = (step * i as f32).sin();
            assert!((sample - expected).abs() < 5e-3, "frame {i}: {sample} vs {expected}");
        }
    }

    #[test]
    fn phase_past_a_swapped_in_shorter_table_wraps() {
        let (_factory, osc) = sine_oscillator();
        osc.set_frequency(375.0);

        // 100 frames at increment 2.0 leaves the phase at 200
        let mut buffer = vec![0.0; 100];
        osc.render(&mut buffer, 100);
        assert_eq!(osc.phase(), 200.0);

        let mut short = WavetableFactory::with_length(64);
        osc.set_wavetable(short.get_wave_table(WavetableKind::Sine));
        let mut buffer = vec![0.0; 1];
        osc.render(&mut buffer, 1);
        // 200 % 64 = 8, plus one increment of 0.5
        assert_eq!(osc.phase(), 8.5);
    }

    #[test]
    fn empty_table_renders_silence() {
        let osc = Oscillator::new(Arc::new(WaveTable::from_samples(Vec::new())));
        osc.set_frequency(440.0);

        let mut buffer = vec![1.0; 32];
        osc.render(&mut buffer, 32);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
