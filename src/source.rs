//! The capability every audio player pulls samples from.

/// Something that can fill audio buffers from a real-time callback.
///
/// Implementations are shared between the control thread and the render
/// thread, so `render` takes `&self`: all mutable state must live behind
/// lock-free atomics. `render` must not block, allocate, free memory or log.
pub trait AudioSource: Send + Sync + 'static {
    /// Write `frame_count` mono samples into the front of `output`.
    ///
    /// If `output` is shorter than `frame_count`, only `output.len()` frames
    /// are rendered.
    fn render(&self, output: &mut [f32], frame_count: usize);

    /// Fill an interleaved buffer of `channels` channels, copying the mono
    /// signal to every channel.
    ///
    /// Works in place: the mono frames are rendered into the front of
    /// `output` and then fanned out back to front.
    fn render_interleaved(&self, output: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }

        let frames = output.len() / channels;
        self.render(output, frames);

        if channels == 1 {
            return;
        }

        for frame in (0..frames).rev() {
            let sample = output[frame];
            output[frame * channels..(frame + 1) * channels].fill(sample);
        }
        // trailing samples that don't form a whole frame
        output[frames * channels..].fill(0.0);
    }
}
