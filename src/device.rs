//! Audio device abstractions.
//!
//! The pipeline depends on a capture device (microphone) and an output
//! device (speaker) but does not hardcode either; the `desktop-audio`
//! feature provides cpal-backed implementations and tests use scripted
//! fakes.

use crate::codec::AudioChunk;
use crate::error::Result;
use async_trait::async_trait;

/// A running microphone capture stream.
///
/// Delivers fixed-size blocks of normalized `f32` samples at a declared
/// rate. Dropping the stream releases the microphone.
#[async_trait]
pub trait CaptureStream: Send {
    /// Sample rate the stream delivers at, in Hz.
    fn sample_rate(&self) -> u32;

    /// Await the next captured block.
    ///
    /// Returns `None` once the stream has ended.
    async fn next_block(&mut self) -> Option<Vec<f32>>;
}

/// A microphone capture device.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request microphone access and start capturing.
    ///
    /// Fails with [`crate::VoiceError::PermissionDenied`] if access is
    /// refused and [`crate::VoiceError::DeviceOpenFailure`] if the stream
    /// cannot be built.
    async fn request_microphone(
        &self,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Box<dyn CaptureStream>>;
}

/// An open output device context with a playback clock.
pub trait DeviceContext: Send + Sync {
    /// Current playback-clock time in seconds.
    fn current_time(&self) -> f64;

    /// Schedule a chunk to begin playing at `start_at` (clock seconds).
    fn schedule(&self, chunk: &AudioChunk, start_at: f64) -> Result<()>;

    /// Release the device. Best-effort and idempotent.
    fn close(&self);
}

/// An output (playback) device.
#[async_trait]
pub trait OutputDevice: Send + Sync {
    /// Open a device context at the given sample rate.
    async fn open(&self, sample_rate: u32) -> Result<Box<dyn DeviceContext>>;
}
