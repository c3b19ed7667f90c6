//! Wavetable generation and per-instance caching.
//!
//! Sine tables are evaluated directly. Triangle, square and saw tables are
//! built by additive synthesis from a fixed number of harmonics of their
//! Fourier series, which keeps them band-limited enough for the 256-sample
//! tables the oscillator plays back.
//!
//! Generation allocates and does real floating point work, so it belongs on
//! the control thread. Once a kind is cached, fetching it is a map lookup and
//! an `Arc` clone.

use core::f32::consts::PI;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::wavetable::{WaveTable, WavetableKind, WAVETABLE_LENGTH};

const TRIANGLE_HARMONICS: u32 = 12;
const SQUARE_HARMONICS: u32 = 6;
const SAW_HARMONICS: u32 = 25;

/// Builds one table per [`WavetableKind`] on first request and serves the
/// cached copy afterwards.
pub struct WavetableFactory {
    length: usize,
    cache: HashMap<WavetableKind, Arc<WaveTable>>,
    silent: Option<Arc<WaveTable>>,
    generated: usize,
}

impl WavetableFactory {
    /// A factory producing tables of [`WAVETABLE_LENGTH`] samples.
    pub fn new() -> Self {
        Self::with_length(WAVETABLE_LENGTH)
    }

    /// A factory producing tables of `length` samples.
    ///
    /// The length is fixed for the lifetime of the factory.
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            cache: HashMap::with_capacity(WavetableKind::ALL.len()),
            silent: None,
            generated: 0,
        }
    }

    #[inline]
    pub fn table_length(&self) -> usize {
        self.length
    }

    /// Get the table for `kind`, generating it on the first call.
    pub fn get_wave_table(&mut self, kind: WavetableKind) -> Arc<WaveTable> {
        if let Some(table) = self.cache.get(&kind) {
            return Arc::clone(table);
        }

        let table = Arc::new(generate(kind, self.length));
        self.generated += 1;
        debug!(kind = kind.name(), length = self.length, "generated wavetable");

        self.cache.insert(kind, Arc::clone(&table));
        table
    }

    /// Get the table for a raw host encoding.
    ///
    /// Unknown values resolve to the all-zero table so the render path always
    /// has `length` samples to read.
    pub fn get_raw_wave_table(&mut self, raw: i32) -> Arc<WaveTable> {
        match WavetableKind::from_raw(raw) {
            Some(kind) => self.get_wave_table(kind),
            None => self.silent_table(),
        }
    }

    /// The all-zero fallback table.
    pub fn silent_table(&mut self) -> Arc<WaveTable> {
        let length = self.length;
        Arc::clone(
            self.silent
                .get_or_insert_with(|| Arc::new(WaveTable::silent(length))),
        )
    }

    /// Generate every kind up front.
    pub fn preload(&mut self) {
        for kind in WavetableKind::ALL {
            let _ = self.get_wave_table(kind);
        }
    }

    #[inline]
    pub fn is_cached(&self, kind: WavetableKind) -> bool {
        self.cache.contains_key(&kind)
    }

    /// How many tables this factory has generated so far.
    #[inline]
    pub fn generation_count(&self) -> usize {
        self.generated
    }
}

impl Default for WavetableFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn generate(kind: WavetableKind, length: usize) -> WaveTable {
    let samples = match kind {
        WavetableKind::Sine => sine(length),
        WavetableKind::Triangle => normalized(triangle(length)),
        WavetableKind::Square => normalized(square(length)),
        WavetableKind::Saw => normalized(saw(length)),
    };
    WaveTable::from_samples(samples)
}

#[inline]
fn phase_at(i: usize, length: usize) -> f32 {
    2.0 * PI * i as f32 / length as f32
}

fn sine(length: usize) -> Vec<f32> {
    (0..length).map(|i| phase_at(i, length).sin()).collect()
}

/// Sum `harmonics` terms of `term(k, phase)` for k = 1..=harmonics.
fn additive(length: usize, harmonics: u32, term: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    let mut table = vec![0.0f32; length];
    for k in 1..=harmonics {
        let k = k as f32;
        for (i, sample) in table.iter_mut().enumerate() {
            *sample += term(k, phase_at(i, length));
        }
    }
    table
}

#[inline]
fn alternating(k: f32) -> f32 {
    if k as u32 % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

fn triangle(length: usize) -> Vec<f32> {
    additive(length, TRIANGLE_HARMONICS, |k, phase| {
        let n = 2.0 * k - 1.0;
        8.0 / (PI * PI) * alternating(k) / (n * n) * (n * phase).sin()
    })
}

fn square(length: usize) -> Vec<f32> {
    additive(length, SQUARE_HARMONICS, |k, phase| {
        let n = 2.0 * k - 1.0;
        4.0 / PI / n * (n * phase).sin()
    })
}

fn saw(length: usize) -> Vec<f32> {
    additive(length, SAW_HARMONICS, |k, phase| {
        2.0 / PI * alternating(k) / k * (k * phase).sin()
    })
}

/// Scale a partial Fourier sum down so its Gibbs overshoot stays within [-1, 1].
fn normalized(mut table: Vec<f32>) -> Vec<f32> {
    let peak = table.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak > 1.0 {
        table.iter_mut().for_each(|s| *s /= peak);
    }
    table
}
