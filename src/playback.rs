//! Gapless playback scheduling.
//!
//! Decoded audio chunks arrive at unpredictable times (network jitter, model
//! generation latency). The scheduler places them on the output device
//! back-to-back, as if they were one continuous stream: no silence gaps, no
//! overlaps, FIFO by arrival. The remote end guarantees generation order, so
//! no reordering happens here.

use crate::codec::AudioChunk;
use crate::device::DeviceContext;
use crate::error::{Result, VoiceError};

/// Schedules decoded chunks seamlessly on an output device context.
///
/// Owns the next-scheduled-start cursor exclusively; the cursor is
/// monotonically non-decreasing and advances each time a chunk is scheduled.
/// Callers on multi-threaded runtimes must serialize access (the controller
/// keeps the scheduler behind a mutex).
pub struct PlaybackScheduler {
    ctx: Option<Box<dyn DeviceContext>>,
    next_start: f64,
}

impl PlaybackScheduler {
    /// Create a scheduler over an open device context.
    ///
    /// The cursor starts at the context's current clock time.
    pub fn new(ctx: Box<dyn DeviceContext>) -> Self {
        let next_start = ctx.current_time();
        Self { ctx: Some(ctx), next_start }
    }

    /// Schedule a chunk for seamless playback; returns its start time.
    ///
    /// The start is `max(cursor, now)`: after a long idle gap the cursor may
    /// lag the device clock, and scheduling in the past would make the device
    /// play chunks immediately and bunch up. A chunk arriving late is played
    /// as soon as possible and later chunks queue after it; nothing is ever
    /// dropped.
    pub fn enqueue(&mut self, chunk: &AudioChunk) -> Result<f64> {
        let ctx = self.ctx.as_ref().ok_or(VoiceError::SessionClosed)?;
        let start_at = self.next_start.max(ctx.current_time());
        ctx.schedule(chunk, start_at)?;
        self.next_start = start_at + chunk.duration_secs();
        Ok(start_at)
    }

    /// The next scheduled start time.
    pub fn cursor(&self) -> f64 {
        self.next_start
    }

    /// Whether the underlying device context is still open.
    pub fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    /// Release the device context. Idempotent; later enqueues fail.
    pub fn close(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.close();
        }
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("next_start", &self.next_start)
            .field("open", &self.ctx.is_some())
            .finish()
    }
}
