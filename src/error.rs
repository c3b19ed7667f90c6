//! Error types for the synthesizer and its audio players.

use thiserror::Error;

/// Errors raised while opening or running an audio output stream.
///
/// None of these ever surface on the render thread; they are returned from
/// [`AudioPlayer::play`](crate::player::AudioPlayer::play) on the control path.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("output device does not support {sample_rate} Hz")]
    UnsupportedSampleRate { sample_rate: u32 },

    #[error("output device has no supported sample format ({0})")]
    UnsupportedSampleFormat(String),

    #[error("failed to spawn audio worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("audio worker exited before reporting stream state")]
    WorkerExited,

    #[cfg(feature = "cpal_sink")]
    #[error("failed to query output configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "cpal_sink")]
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal_sink")]
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Errors raised by the synthesizer facade.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid synthesizer config: {0}")]
    InvalidConfig(String),

    #[error("unknown wavetable kind {0}")]
    UnknownWavetable(i32),

    #[error(transparent)]
    Player(#[from] PlayerError),
}
