//! The synthesizer facade: one oscillator, one audio player, and the rules for
//! changing either while audio is running.
//!
//! `play`/`stop` are serialized by a mutex that guards only the player's
//! lifecycle. Parameter setters go straight to the oscillator's lock-free
//! storage and never wait on that mutex, so they are safe to call at any time,
//! including while the render callback is running.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{db_to_linear, SynthesizerConfig};
use crate::error::SynthError;
use crate::factory::WavetableFactory;
use crate::oscillator::Oscillator;
use crate::player::AudioPlayer;
use crate::source::AudioSource;
use crate::wavetable::WavetableKind;

/// Player lifecycle, guarded by the play/stop mutex.
struct Playback {
    playing: bool,
    player: Box<dyn AudioPlayer>,
}

impl Playback {
    /// Tear down a stream the player no longer reports as active.
    fn reap_inactive(&mut self) {
        if self.playing && !self.player.is_active() {
            warn!("audio stream is no longer active, stopping");
            self.player.stop();
            self.playing = false;
        }
    }
}

/// Wavetable selection state. Never touched by the render thread.
struct Selection {
    factory: WavetableFactory,
    /// `None` while the silent fallback table is selected.
    current: Option<WavetableKind>,
}

pub struct Synthesizer {
    // Declared first so the stream is torn down before the oscillator is
    // released.
    playback: Mutex<Playback>,
    selection: Mutex<Selection>,
    oscillator: Arc<Oscillator>,
    volume_db: AtomicCell<f32>,
    config: SynthesizerConfig,
}

impl Synthesizer {
    /// A synthesizer with the default config and the default player for this
    /// build: the system audio output with `cpal_sink`, a
    /// [`ClockPlayer`](crate::player::ClockPlayer) otherwise.
    pub fn new() -> Result<Self, SynthError> {
        Self::with_config(SynthesizerConfig::default())
    }

    pub fn with_config(config: SynthesizerConfig) -> Result<Self, SynthError> {
        Self::with_player(config, default_player)
    }

    /// Build a synthesizer whose oscillator is rendered by the player that
    /// `make_player` creates.
    pub fn with_player<F, P>(config: SynthesizerConfig, make_player: F) -> Result<Self, SynthError>
    where
        F: FnOnce(Arc<dyn AudioSource>, &SynthesizerConfig) -> P,
        P: AudioPlayer,
    {
        config.validate()?;

        let mut factory = WavetableFactory::with_length(config.table_length);
        // every later selection becomes a cache hit
        factory.preload();

        let initial = config.initial_wavetable;
        let oscillator = Arc::new(Oscillator::with_sample_rate(
            factory.get_wave_table(initial),
            config.sample_rate,
        ));

        let player = make_player(Arc::clone(&oscillator) as Arc<dyn AudioSource>, &config);

        let synth = Self {
            playback: Mutex::new(Playback {
                playing: false,
                player: Box::new(player),
            }),
            selection: Mutex::new(Selection {
                factory,
                current: Some(initial),
            }),
            oscillator,
            volume_db: AtomicCell::new(0.0),
            config,
        };

        synth.set_frequency(synth.config.initial_frequency);
        synth.set_volume(synth.config.initial_volume_db);

        debug!(
            sample_rate = synth.config.sample_rate,
            table_length = synth.config.table_length,
            wavetable = initial.name(),
            "synthesizer created"
        );
        Ok(synth)
    }

    /// Start the audio stream. Does nothing if already playing.
    ///
    /// A stream that faulted since the last call is torn down and reopened.
    /// On failure the synthesizer stays stopped.
    pub fn play(&self) -> Result<(), SynthError> {
        let mut playback = self.playback.lock();
        playback.reap_inactive();
        if playback.playing {
            return Ok(());
        }

        match playback.player.play() {
            Ok(()) => {
                playback.playing = true;
                info!("playback started");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "playback failed to start");
                Err(err.into())
            }
        }
    }

    /// Stop the audio stream. When this returns, the render callback is no
    /// longer running. Does nothing if already stopped.
    pub fn stop(&self) {
        let mut playback = self.playback.lock();
        if !playback.playing {
            return;
        }

        playback.player.stop();
        playback.playing = false;
        self.oscillator.reclaim_retired();
        info!("playback stopped");
    }

    /// Whether audio is playing.
    ///
    /// A stream the player reports as dead (for example after a device
    /// error) is torn down here and reported as stopped.
    pub fn is_playing(&self) -> bool {
        let mut playback = self.playback.lock();
        playback.reap_inactive();
        playback.playing
    }

    /// Set the oscillator frequency in Hz, clamped to the configured range.
    /// NaN is ignored.
    pub fn set_frequency(&self, hz: f32) {
        debug!(hz, "set_frequency");
        let Some(clamped) = self.config.clamp_frequency(hz) else {
            warn!("ignoring NaN frequency");
            return;
        };
        if clamped != hz {
            warn!(requested = hz, clamped, "frequency out of range");
        }
        self.oscillator.set_frequency(clamped);
    }

    /// Set the output volume in dB, clamped to the configured range.
    /// NaN is ignored.
    pub fn set_volume(&self, db: f32) {
        debug!(db, "set_volume");
        let Some(clamped) = self.config.clamp_volume_db(db) else {
            warn!("ignoring NaN volume");
            return;
        };
        if clamped != db {
            warn!(requested = db, clamped, "volume out of range");
        }
        self.volume_db.store(clamped);
        self.oscillator.set_amplitude(db_to_linear(clamped));
    }

    /// Select the waveform. Selecting the current one does nothing.
    pub fn set_wavetable(&self, kind: WavetableKind) {
        debug!(wavetable = kind.name(), "set_wavetable");
        let mut selection = self.selection.lock();
        if selection.current == Some(kind) {
            return;
        }

        let table = selection.factory.get_wave_table(kind);
        self.oscillator.set_wavetable(table);
        selection.current = Some(kind);
    }

    /// Select the waveform from the host's integer encoding.
    ///
    /// Values that don't name a waveform select a silent table.
    pub fn set_wavetable_raw(&self, raw: i32) {
        match WavetableKind::from_raw(raw) {
            Some(kind) => self.set_wavetable(kind),
            None => {
                warn!(raw, "unknown wavetable, selecting silence");
                let mut selection = self.selection.lock();
                if selection.current.is_none() {
                    return;
                }
                let silent = selection.factory.silent_table();
                self.oscillator.set_wavetable(silent);
                selection.current = None;
            }
        }
    }

    /// The selected waveform, or `None` if the silent fallback is selected.
    pub fn wavetable(&self) -> Option<WavetableKind> {
        self.selection.lock().current
    }

    /// Current frequency in Hz after clamping.
    pub fn frequency(&self) -> f32 {
        self.oscillator.frequency()
    }

    /// Current volume in dB after clamping.
    pub fn volume_db(&self) -> f32 {
        self.volume_db.load()
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// The oscillator the player renders from.
    pub fn oscillator(&self) -> &Arc<Oscillator> {
        &self.oscillator
    }
}

impl Drop for Synthesizer {
    fn drop(&mut self) {
        let playback = self.playback.get_mut();
        if playback.playing {
            playback.player.stop();
            playback.playing = false;
        }
        debug!("synthesizer destroyed");
    }
}

#[cfg(feature = "cpal_sink")]
fn default_player(source: Arc<dyn AudioSource>, config: &SynthesizerConfig) -> Box<dyn AudioPlayer> {
    Box::new(crate::player::CpalPlayer::new(source, config))
}

#[cfg(not(feature = "cpal_sink"))]
fn default_player(source: Arc<dyn AudioSource>, config: &SynthesizerConfig) -> Box<dyn AudioPlayer> {
    Box::new(crate::player::ClockPlayer::new(source, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlayerError;
    use crate::player::ClockPlayer;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Records lifecycle calls; can be told to fail or to fault.
    #[derive(Clone, Default)]
    struct Probe {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        active: Arc<AtomicBool>,
        fail: Arc<AtomicBool>,
    }

    struct ProbePlayer(Probe);

    impl AudioPlayer for ProbePlayer {
        fn play(&mut self) -> Result<(), PlayerError> {
            if self.0.fail.load(Ordering::SeqCst) {
                return Err(PlayerError::NoDevice);
            }
            self.0.starts.fetch_add(1, Ordering::SeqCst);
            self.0.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) {
            self.0.stops.fetch_add(1, Ordering::SeqCst);
            self.0.active.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.0.active.load(Ordering::SeqCst)
        }
    }

    fn probed() -> (Synthesizer, Probe) {
        let probe = Probe::default();
        let player_probe = probe.clone();
        let synth = Synthesizer::with_player(SynthesizerConfig::default(), move |_, _| {
            ProbePlayer(player_probe)
        })
        .unwrap();
        (synth, probe)
    }

    #[test]
    fn starts_stopped_with_initial_parameters() {
        let (synth, probe) = probed();

        assert!(!synth.is_playing());
        assert_eq!(synth.wavetable(), Some(WavetableKind::Sine));
        assert_eq!(synth.frequency(), 300.0);
        assert_eq!(synth.volume_db(), -24.0);
        assert_eq!(probe.starts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn play_and_stop_are_idempotent() {
        let (synth, probe) = probed();

        synth.play().unwrap();
        synth.play().unwrap();
        assert!(synth.is_playing());
        assert_eq!(probe.starts.load(Ordering::SeqCst), 1);

        synth.stop();
        synth.stop();
        assert!(!synth.is_playing());
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_start_stays_stopped() {
        let (synth, probe) = probed();
        probe.fail.store(true, Ordering::SeqCst);

        assert!(matches!(
            synth.play(),
            Err(SynthError::Player(PlayerError::NoDevice))
        ));
        assert!(!synth.is_playing());

        probe.fail.store(false, Ordering::SeqCst);
        synth.play().unwrap();
        assert!(synth.is_playing());
    }

    #[test]
    fn faulted_stream_is_reaped() {
        let (synth, probe) = probed();
        synth.play().unwrap();

        probe.active.store(false, Ordering::SeqCst);
        assert!(!synth.is_playing());
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn play_after_a_fault_restarts_the_stream() {
        let (synth, probe) = probed();
        synth.play().unwrap();

        probe.active.store(false, Ordering::SeqCst);
        synth.play().unwrap();

        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
        assert_eq!(probe.starts.load(Ordering::SeqCst), 2);
        assert!(probe.active.load(Ordering::SeqCst));
        assert!(synth.is_playing());
    }

    #[test]
    fn drop_stops_a_playing_stream() {
        let (synth, probe) = probed();
        synth.play().unwrap();
        drop(synth);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
        assert!(!probe.active.load(Ordering::SeqCst));
    }

    #[test]
    fn volume_is_converted_from_decibels() {
        let (synth, _probe) = probed();

        synth.set_volume(0.0);
        assert_eq!(synth.oscillator().amplitude(), 1.0);

        synth.set_volume(-20.0);
        assert!((synth.oscillator().amplitude() - 0.1).abs() < 1e-6);

        synth.set_volume(12.0);
        assert_eq!(synth.volume_db(), 0.0);
        assert_eq!(synth.oscillator().amplitude(), 1.0);

        synth.set_volume(f32::NAN);
        assert_eq!(synth.volume_db(), 0.0);
    }

    #[test]
    fn frequency_is_clamped_before_the_oscillator() {
        let (synth, _probe) = probed();

        synth.set_frequency(440.0);
        assert_eq!(synth.frequency(), 440.0);

        synth.set_frequency(0.0);
        assert_eq!(synth.frequency(), 1.0);
        assert!(synth.oscillator().phase_increment() > 0.0);

        synth.set_frequency(-300.0);
        assert!(synth.oscillator().phase_increment() > 0.0);

        synth.set_frequency(30_000.0);
        assert!(synth.frequency() < synth.config().nyquist());

        synth.set_frequency(f32::NAN);
        assert!(synth.frequency() < synth.config().nyquist());
    }

    #[test]
    fn reselecting_the_current_wavetable_does_not_swap() {
        let (synth, _probe) = probed();
        let before = synth.oscillator().wavetable();

        synth.set_wavetable(WavetableKind::Sine);
        assert!(Arc::ptr_eq(&before, &synth.oscillator().wavetable()));

        synth.set_wavetable(WavetableKind::Saw);
        assert_eq!(synth.wavetable(), Some(WavetableKind::Saw));
        assert!(!Arc::ptr_eq(&before, &synth.oscillator().wavetable()));
    }

    #[test]
    fn unknown_raw_wavetable_selects_silence() {
        let (synth, _probe) = probed();
        synth.set_frequency(1_000.0);
        synth.set_volume(0.0);

        synth.set_wavetable_raw(99);
        assert_eq!(synth.wavetable(), None);

        let mut buffer = vec![1.0; 128];
        synth.oscillator().render(&mut buffer, 128);
        assert!(buffer.iter().all(|&s| s == 0.0));

        synth.set_wavetable_raw(2);
        assert_eq!(synth.wavetable(), Some(WavetableKind::Square));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SynthesizerConfig::default().with_channels(0);
        let result = Synthesizer::with_player(config, |source, config| ClockPlayer::new(source, config));
        assert!(matches!(result, Err(SynthError::InvalidConfig(_))));
    }
}
