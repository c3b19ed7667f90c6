//! Audio players: own an output stream and pull samples from an [`AudioSource`]
//! on every real-time callback.
//!
//! - [`ClockPlayer`] renders on its own software-clocked thread, for headless
//!   hosts and tests. It can forward what it renders into an `rtrb` ring.
//! - `CpalPlayer` (feature `cpal_sink`) drives the platform's audio stream.

mod clock;
#[cfg(feature = "cpal_sink")]
mod cpal_player;
#[cfg(feature = "cpal_sink")]
pub mod device;

pub use clock::ClockPlayer;
#[cfg(feature = "cpal_sink")]
pub use cpal_player::CpalPlayer;

use crate::error::PlayerError;
use crate::source::AudioSource;

/// Mono frames rendered per pass when converting into a device buffer.
pub(crate) const SCRATCH_FRAMES: usize = 1024;

/// Lifecycle of one output stream.
///
/// The render callback a player registers must only call into its source and
/// return: no locks, no allocation, no logging.
pub trait AudioPlayer: Send + 'static {
    /// Open and start the stream if it is not already running.
    fn play(&mut self) -> Result<(), PlayerError>;

    /// Halt and tear down the stream. When this returns, no further render
    /// callbacks will run. Does nothing if already stopped.
    fn stop(&mut self);

    /// Whether the stream is open and has not faulted.
    fn is_active(&self) -> bool;
}

impl<P: AudioPlayer + ?Sized> AudioPlayer for Box<P> {
    fn play(&mut self) -> Result<(), PlayerError> {
        (**self).play()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

/// Fill an interleaved device buffer from a mono source.
///
/// Renders in passes of at most `scratch.len()` frames so the callback never
/// needs more memory than the scratch it was given. Samples of a trailing
/// partial frame are set to silence.
pub(crate) fn write_frames<T: Copy>(
    source: &dyn AudioSource,
    data: &mut [T],
    channels: usize,
    scratch: &mut [f32],
    convert: impl Fn(f32) -> T,
) {
    if channels == 0 || scratch.is_empty() {
        return;
    }

    let whole = data.len() / channels * channels;
    let (frames_out, remainder) = data.split_at_mut(whole);

    for chunk in frames_out.chunks_mut(scratch.len() * channels) {
        let frames = chunk.len() / channels;
        let mono = &mut scratch[..frames];
        source.render(mono, frames);

        for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
            frame.fill(convert(sample));
        }
    }

    remainder.fill(convert(0.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts up across calls so chunk boundaries are visible.
    struct Counter(AtomicUsize);

    impl AudioSource for Counter {
        fn render(&self, output: &mut [f32], frame_count: usize) {
            for sample in output.iter_mut().take(frame_count) {
                *sample = self.0.fetch_add(1, Ordering::Relaxed) as f32;
            }
        }
    }

    #[test]
    fn writes_every_frame_across_scratch_passes() {
        let source = Counter(AtomicUsize::new(0));
        let mut scratch = [0.0f32; 3];
        let mut data = [0i32; 14];

        write_frames(&source, &mut data, 2, &mut scratch, |s| s as i32);

        assert_eq!(data, [0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn partial_frame_is_silenced() {
        let source = Counter(AtomicUsize::new(1));
        let mut scratch = [0.0f32; 8];
        let mut data = [7.0f32; 7];

        write_frames(&source, &mut data, 3, &mut scratch, |s| s);

        assert_eq!(data, [1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 0.0]);
    }
}
