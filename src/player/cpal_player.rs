//! CPAL-backed audio player.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use tracing::{debug, error, info};

use crate::config::SynthesizerConfig;
use crate::error::PlayerError;
use crate::player::device::{NegotiatedConfig, OutputDevice};
use crate::player::{write_frames, AudioPlayer, SCRATCH_FRAMES};
use crate::source::AudioSource;

/// Plays an [`AudioSource`] on the default output device.
///
/// `cpal::Stream` is not `Send` on every platform, so the stream lives on a
/// dedicated owner thread for as long as it plays, and this handle only
/// talks to that thread over channels. Stream errors reported by the backend
/// are forwarded to the owner thread, which logs them and tears the stream
/// down; [`is_active`](AudioPlayer::is_active) then reports `false`.
pub struct CpalPlayer {
    source: Arc<dyn AudioSource>,
    sample_rate: u32,
    channels: u16,
    buffer_frames: u32,
    worker: Option<StreamWorker>,
}

struct StreamWorker {
    shutdown: Sender<()>,
    faulted: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

struct StreamRequest {
    source: Arc<dyn AudioSource>,
    sample_rate: u32,
    channels: u16,
    buffer_frames: u32,
}

impl CpalPlayer {
    pub fn new(source: Arc<dyn AudioSource>, config: &SynthesizerConfig) -> Self {
        Self {
            source,
            sample_rate: config.sample_rate,
            channels: config.channels,
            buffer_frames: config.buffer_frames,
            worker: None,
        }
    }
}

impl AudioPlayer for CpalPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        if let Some(worker) = &self.worker {
            if !worker.faulted.load(Ordering::SeqCst) {
                return Ok(());
            }
            // reap the faulted stream before opening a new one
            self.stop();
        }

        let request = StreamRequest {
            source: Arc::clone(&self.source),
            sample_rate: self.sample_rate,
            channels: self.channels,
            buffer_frames: self.buffer_frames,
        };
        let (ready_tx, ready_rx) = channel::bounded(1);
        let (shutdown, shutdown_rx) = channel::bounded(1);
        let faulted = Arc::new(AtomicBool::new(false));
        let worker_faulted = Arc::clone(&faulted);

        let thread = thread::Builder::new()
            .name("synth-stream".into())
            .spawn(move || run_stream(request, ready_tx, shutdown_rx, worker_faulted))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(StreamWorker {
                    shutdown,
                    faulted,
                    thread,
                });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlayerError::WorkerExited)
            }
        }
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.shutdown.send(());
        if worker.thread.join().is_err() {
            error!("audio stream thread panicked");
        }
    }

    fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.faulted.load(Ordering::SeqCst))
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the stream owner thread.
fn run_stream(
    request: StreamRequest,
    ready: Sender<Result<(), PlayerError>>,
    shutdown: Receiver<()>,
    faulted: Arc<AtomicBool>,
) {
    let (fault_tx, fault_rx) = channel::bounded::<cpal::StreamError>(1);

    let stream = match open_stream(&request, fault_tx) {
        Ok(stream) => stream,
        Err(err) => {
            error!(%err, "failed to open output stream");
            let _ = ready.send(Err(err));
            return;
        }
    };

    if let Err(err) = stream.play() {
        error!(%err, "failed to start output stream");
        let _ = ready.send(Err(err.into()));
        return;
    }
    let _ = ready.send(Ok(()));

    select! {
        recv(shutdown) -> _ => {}
        recv(fault_rx) -> fault => {
            faulted.store(true, Ordering::SeqCst);
            match fault {
                Ok(err) => error!(%err, "output stream failed, stopping"),
                Err(_) => error!("output stream error channel closed, stopping"),
            }
        }
    }

    if let Err(err) = stream.pause() {
        debug!(%err, "could not pause output stream before teardown");
    }
    // dropping the stream joins the backend's callback thread
    drop(stream);
    info!("output stream closed");
}

fn open_stream(
    request: &StreamRequest,
    faults: Sender<cpal::StreamError>,
) -> Result<cpal::Stream, PlayerError> {
    let device = OutputDevice::default_output().ok_or(PlayerError::NoDevice)?;
    let NegotiatedConfig {
        config,
        sample_format,
    } = device.negotiate(request.sample_rate, request.channels, request.buffer_frames)?;

    info!(
        device = device.name(),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        format = ?sample_format,
        buffer = ?config.buffer_size,
        "opening output stream"
    );

    let source = Arc::clone(&request.source);
    let device = device.device();
    match sample_format {
        SampleFormat::F32 => build_stream::<f32>(device, &config, source, faults),
        SampleFormat::F64 => build_stream::<f64>(device, &config, source, faults),
        SampleFormat::I16 => build_stream::<i16>(device, &config, source, faults),
        SampleFormat::U16 => build_stream::<u16>(device, &config, source, faults),
        SampleFormat::I32 => build_stream::<i32>(device, &config, source, faults),
        other => Err(PlayerError::UnsupportedSampleFormat(format!("{other:?}"))),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    source: Arc<dyn AudioSource>,
    faults: Sender<cpal::StreamError>,
) -> Result<cpal::Stream, PlayerError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch = [0.0f32; SCRATCH_FRAMES];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            write_frames(source.as_ref(), data, channels, &mut scratch, |s| T::from_sample(s));
        },
        move |err| {
            // bounded and non-blocking; the owner thread only needs the first fault
            let _ = faults.try_send(err);
        },
        None,
    )?;

    Ok(stream)
}
