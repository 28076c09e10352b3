//! PCM16 frame codec.
//!
//! Converts between the capture device's `f32` samples and the little-endian
//! 16-bit PCM wire format the streaming API expects. Both directions are
//! pure transforms; no state is kept here.

use crate::error::{Result, VoiceError};
use bytes::Bytes;

/// Scale factor between normalized floats and 16-bit samples.
const PCM16_SCALE: f32 = 32767.0;

/// A decoded, ready-to-play block of single-channel audio samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Normalized samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz the chunk was produced at.
    pub sample_rate: u32,
    /// Number of interleaved channels (always 1 in this system).
    pub channels: u16,
}

impl AudioChunk {
    /// Create a new audio chunk.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self { samples, sample_rate, channels }
    }

    /// Create a mono chunk at the given rate.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Playback duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// An encoded, wire-ready frame of captured audio.
///
/// `data` holds packed little-endian `i16` samples; `mime_type` declares the
/// encoding and sample rate (e.g. `audio/pcm;rate=16000`). This is the one
/// externally-visible byte-level contract and must be reproduced exactly for
/// interoperability with the remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// Raw little-endian PCM16 bytes.
    pub data: Bytes,
    /// Declared encoding and sample rate.
    pub mime_type: String,
}

impl WireFrame {
    /// Encode the payload as base64 for the JSON transport.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Number of PCM16 samples in this frame.
    pub fn sample_count(&self) -> usize {
        self.data.len() / 2
    }
}

/// MIME type string for raw PCM at the given rate.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Encode normalized `f32` samples as a little-endian PCM16 wire frame.
///
/// Samples outside [-1.0, 1.0] are clamped, not wrapped, so overflow can
/// never produce audible artifacts.
pub fn encode_frame(samples: &[f32], sample_rate: u32) -> WireFrame {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * PCM16_SCALE) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }
    WireFrame { data: Bytes::from(data), mime_type: pcm_mime_type(sample_rate) }
}

/// Decode little-endian PCM16 bytes into an [`AudioChunk`].
///
/// Fails with [`VoiceError::MalformedAudioData`] if the byte length is not a
/// multiple of 2 (incomplete trailing sample).
pub fn decode_frame(data: &[u8], sample_rate: u32, channels: u16) -> Result<AudioChunk> {
    if data.len() % 2 != 0 {
        return Err(VoiceError::malformed(format!(
            "PCM16 byte length {} is not a multiple of 2",
            data.len()
        )));
    }
    let samples = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect();
    Ok(AudioChunk::new(samples, sample_rate, channels))
}

/// Decode a base64 payload straight into an [`AudioChunk`].
pub fn decode_base64_frame(encoded: &str, sample_rate: u32, channels: u16) -> Result<AudioChunk> {
    use base64::Engine;
    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| VoiceError::malformed(format!("invalid base64 audio payload: {e}")))?;
    decode_frame(&data, sample_rate, channels)
}
