//! Software-clocked player.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use rtrb::Producer;
use tracing::{debug, error};

use crate::config::SynthesizerConfig;
use crate::error::PlayerError;
use crate::player::AudioPlayer;
use crate::source::AudioSource;

/// Renders one buffer per buffer period on a dedicated thread, the way a
/// platform audio callback would, without any audio hardware.
///
/// Rendered interleaved samples can be forwarded to an `rtrb` consumer with
/// [`with_tap`](Self::with_tap). When the ring is too full for a whole
/// buffer, that buffer is dropped and counted rather than waited on.
pub struct ClockPlayer {
    source: Arc<dyn AudioSource>,
    channels: usize,
    buffer_frames: usize,
    period: Duration,
    tap: Option<Producer<f32>>,
    stats: Arc<ClockStats>,
    worker: Option<Worker>,
}

#[derive(Default)]
struct ClockStats {
    blocks: AtomicU64,
    dropped: AtomicU64,
}

struct Worker {
    shutdown: Sender<()>,
    thread: JoinHandle<Option<Producer<f32>>>,
}

impl ClockPlayer {
    pub fn new(source: Arc<dyn AudioSource>, config: &SynthesizerConfig) -> Self {
        Self {
            source,
            channels: config.channels.max(1) as usize,
            buffer_frames: config.buffer_frames.max(1) as usize,
            period: Duration::from_secs_f64(config.buffer_period_secs()),
            tap: None,
            stats: Arc::new(ClockStats::default()),
            worker: None,
        }
    }

    /// Forward every rendered buffer into `tap`.
    pub fn with_tap(mut self, tap: Producer<f32>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Buffers rendered since construction.
    pub fn blocks_rendered(&self) -> u64 {
        self.stats.blocks.load(Ordering::Relaxed)
    }

    /// Samples that did not fit into the tap.
    pub fn samples_dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

impl AudioPlayer for ClockPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (shutdown, shutdown_rx) = channel::bounded::<()>(1);
        let source = Arc::clone(&self.source);
        let stats = Arc::clone(&self.stats);
        let mut tap = self.tap.take();
        let channels = self.channels;
        let samples = self.buffer_frames * channels;
        let period = self.period;

        let thread = thread::Builder::new()
            .name("synth-clock".into())
            .spawn(move || {
                let mut buffer = vec![0.0f32; samples];
                let mut deadline = Instant::now();

                loop {
                    source.render_interleaved(&mut buffer, channels);
                    stats.blocks.fetch_add(1, Ordering::Relaxed);

                    if let Some(tap) = tap.as_mut() {
                        if tap.slots() >= buffer.len() {
                            for &sample in buffer.iter() {
                                let _ = tap.push(sample);
                            }
                        } else {
                            stats.dropped.fetch_add(buffer.len() as u64, Ordering::Relaxed);
                        }
                    }

                    deadline += period;
                    match shutdown_rx.recv_deadline(deadline) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                tap
            })?;

        debug!(channels, frames = self.buffer_frames, "clock player started");
        self.worker = Some(Worker { shutdown, thread });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.shutdown.send(());
        match worker.thread.join() {
            Ok(tap) => self.tap = tap,
            Err(_) => error!("clock player thread panicked"),
        }
        debug!(blocks = self.blocks_rendered(), "clock player stopped");
    }

    fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.thread.is_finished())
    }
}

impl Drop for ClockPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
