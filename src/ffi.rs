//! Opaque-handle C ABI.
//!
//! Each [`Synthesizer`] created through this layer lives in a
//! [`HandleRegistry`] and is addressed by a [`SynthHandle`]. Calls against a
//! handle that was never issued, or was already destroyed, do nothing apart
//! from a `warn` log line.
//!
//! The `extern "C"` functions at the bottom of this module share one
//! process-wide registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::SynthError;
use crate::synthesizer::Synthesizer;

/// Identifies one synthesizer in a [`HandleRegistry`]. `0` is never issued,
/// so hosts can use it as their null value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SynthHandle(u64);

impl SynthHandle {
    pub const NULL: SynthHandle = SynthHandle(0);

    pub fn from_raw(raw: u64) -> Self {
        SynthHandle(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Owns the synthesizers handed out across the C boundary.
pub struct HandleRegistry {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<Synthesizer>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create a synthesizer with the default config and player.
    pub fn create(&self) -> Result<SynthHandle, SynthError> {
        Ok(self.insert(Synthesizer::new()?))
    }

    /// Take ownership of an already built synthesizer.
    pub fn insert(&self, synth: Synthesizer) -> SynthHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(id, Arc::new(synth));
        debug!(handle = id, "handle issued");
        SynthHandle(id)
    }

    /// Remove a synthesizer. Playback is stopped before it is freed.
    ///
    /// Returns `false` for an unknown handle.
    pub fn destroy(&self, handle: SynthHandle) -> bool {
        // drop outside the lock: tearing down a stream joins threads
        let removed = self.entries.lock().remove(&handle.0);
        match removed {
            Some(synth) => {
                synth.stop();
                debug!(handle = handle.0, "handle destroyed");
                true
            }
            None => {
                warn!(handle = handle.0, "destroy called with invalid handle");
                false
            }
        }
    }

    pub fn get(&self, handle: SynthHandle) -> Option<Arc<Synthesizer>> {
        self.entries.lock().get(&handle.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the synthesizer behind `handle`, or log and return
    /// `None` if there is none.
    pub fn with<R>(
        &self,
        handle: SynthHandle,
        op: &str,
        f: impl FnOnce(&Synthesizer) -> R,
    ) -> Option<R> {
        match self.get(handle) {
            Some(synth) => Some(f(&synth)),
            None => {
                warn!(handle = handle.0, op, "invalid synthesizer handle");
                None
            }
        }
    }

    pub fn play(&self, handle: SynthHandle) -> Result<(), SynthError> {
        self.with(handle, "play", |synth| synth.play()).unwrap_or(Ok(()))
    }

    pub fn stop(&self, handle: SynthHandle) {
        self.with(handle, "stop", |synth| synth.stop());
    }

    pub fn is_playing(&self, handle: SynthHandle) -> bool {
        self.with(handle, "is_playing", |synth| synth.is_playing())
            .unwrap_or(false)
    }

    pub fn set_frequency(&self, handle: SynthHandle, hz: f32) {
        self.with(handle, "set_frequency", |synth| synth.set_frequency(hz));
    }

    pub fn set_volume(&self, handle: SynthHandle, db: f32) {
        self.with(handle, "set_volume", |synth| synth.set_volume(db));
    }

    pub fn set_wavetable(&self, handle: SynthHandle, kind: i32) {
        self.with(handle, "set_wavetable", |synth| synth.set_wavetable_raw(kind));
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn registry() -> &'static HandleRegistry {
    static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();
    REGISTRY.get_or_init(HandleRegistry::new)
}

/// Create a synthesizer. Returns `0` if it could not be built.
#[no_mangle]
pub extern "C" fn wavetable_synth_create() -> u64 {
    match registry().create() {
        Ok(handle) => handle.as_raw(),
        Err(err) => {
            error!(%err, "failed to create synthesizer");
            0
        }
    }
}

#[no_mangle]
pub extern "C" fn wavetable_synth_destroy(handle: u64) {
    registry().destroy(SynthHandle(handle));
}

/// Returns `0` on success (or for an invalid handle) and `-1` if the audio
/// stream could not be started.
#[no_mangle]
pub extern "C" fn wavetable_synth_play(handle: u64) -> i32 {
    match registry().play(SynthHandle(handle)) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[no_mangle]
pub extern "C" fn wavetable_synth_stop(handle: u64) {
    registry().stop(SynthHandle(handle));
}

#[no_mangle]
pub extern "C" fn wavetable_synth_is_playing(handle: u64) -> bool {
    registry().is_playing(SynthHandle(handle))
}

#[no_mangle]
pub extern "C" fn wavetable_synth_set_frequency(handle: u64, hz: f32) {
    registry().set_frequency(SynthHandle(handle), hz);
}

#[no_mangle]
pub extern "C" fn wavetable_synth_set_volume(handle: u64, db: f32) {
    registry().set_volume(SynthHandle(handle), db);
}

/// `kind` is `0` sine, `1` triangle, `2` square, `3` saw. Anything else
/// selects silence.
#[no_mangle]
pub extern "C" fn wavetable_synth_set_wavetable(handle: u64, kind: i32) {
    registry().set_wavetable(SynthHandle(handle), kind);
}
