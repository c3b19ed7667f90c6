//! Play each waveform on the default output device while sweeping the pitch.
//!
//! Run with: cargo run --example play_wavetable --features cpal_sink
//!
//! Set `RUST_LOG=wavetable_synth=debug` to see parameter changes.

use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use wavetable_synth::player::device::OutputDevice;
use wavetable_synth::{Synthesizer, WavetableKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let devices = OutputDevice::list_outputs();
    if devices.is_empty() {
        eprintln!("No audio output devices found!");
        return Ok(());
    }
    println!("Available audio output devices:");
    for device in &devices {
        println!("  {}", device.name());
    }

    let synth = Synthesizer::new()?;
    synth.set_volume(-18.0);
    synth.play()?;

    for kind in WavetableKind::ALL {
        println!("\n{} sweep", kind.name());
        synth.set_wavetable(kind);

        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            let t = start.elapsed().as_secs_f32();
            // one octave up and back down
            let hz = 220.0 * 2f32.powf(1.0 - (t - 1.0).abs());
            synth.set_frequency(hz);
            sleep(Duration::from_millis(5));
        }

        if !synth.is_playing() {
            eprintln!("Output stream stopped unexpectedly");
            break;
        }
    }

    synth.stop();
    println!("\nDone.");
    Ok(())
}
