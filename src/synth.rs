//! One-shot speech synthesis.
//!
//! Stateless text-to-speech: each request stands alone and shares no state
//! with the live session controller or the playback scheduler.

use crate::codec::AudioChunk;
use crate::device::OutputDevice;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A one-shot speech synthesizer.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for `text` in the given voice.
    ///
    /// Fails with [`crate::VoiceError::SynthesisFailure`] when the provider
    /// returns no audio payload or the call fails.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioChunk>;
}

/// Synthesize `text` and play it immediately on a disposable device context.
///
/// The context is opened only after synthesis succeeds, so a failed request
/// leaves no device resources behind; it is closed once playback finishes.
pub async fn speak_once(
    synthesizer: &dyn SpeechSynthesizer,
    output: &dyn OutputDevice,
    text: &str,
    voice: &str,
) -> Result<()> {
    let chunk = synthesizer.synthesize(text, voice).await?;
    debug!(
        samples = chunk.samples.len(),
        sample_rate = chunk.sample_rate,
        "synthesized speech chunk"
    );

    let ctx = output.open(chunk.sample_rate).await?;
    let result = ctx.schedule(&chunk, ctx.current_time());
    if result.is_ok() {
        tokio::time::sleep(Duration::from_secs_f64(chunk.duration_secs())).await;
    }
    ctx.close();
    result
}
