//! Real-time wavetable synthesizer core.
//!
//! One [`Synthesizer`] owns one [`Oscillator`] and one [`AudioPlayer`]. The
//! player's render callback reads the oscillator without locking, while the
//! control thread changes frequency, volume and waveform at any time.
//!
//! ```no_run
//! use wavetable_synth::{Synthesizer, WavetableKind};
//!
//! let synth = Synthesizer::new()?;
//! synth.set_wavetable(WavetableKind::Square);
//! synth.set_frequency(440.0);
//! synth.set_volume(-6.0);
//! synth.play()?;
//! # Ok::<(), wavetable_synth::SynthError>(())
//! ```
//!
//! Enable the `cpal_sink` feature to play through the system's default
//! output device. Without it, [`Synthesizer::new`] uses a [`ClockPlayer`].

pub mod config;
pub mod error;
pub mod factory;
pub mod ffi;
pub mod oscillator;
pub mod player;
pub mod source;
pub mod synthesizer;
mod table_slot;
pub mod wavetable;

pub use config::{db_to_linear, SynthesizerConfig};
pub use error::{PlayerError, SynthError};
pub use factory::WavetableFactory;
pub use ffi::{HandleRegistry, SynthHandle};
pub use oscillator::Oscillator;
pub use player::{AudioPlayer, ClockPlayer};
#[cfg(feature = "cpal_sink")]
pub use player::CpalPlayer;
pub use source::AudioSource;
pub use synthesizer::Synthesizer;
pub use wavetable::{WaveTable, WavetableKind, SAMPLE_RATE, WAVETABLE_LENGTH};
