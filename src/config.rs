//! Configuration for live voice sessions.

use serde::{Deserialize, Serialize};

/// Default capture (microphone) sample rate in Hz.
pub const DEFAULT_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Default playback (synthesized speech) sample rate in Hz.
pub const DEFAULT_OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Default number of samples per captured block.
pub const DEFAULT_CAPTURE_BLOCK_SIZE: usize = 4096;

/// Configuration for a live voice session.
///
/// The capture and playback rates are independent and never assumed equal:
/// the remote model consumes 16 kHz input and produces 24 kHz output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Model to use (provider-specific). `None` selects the provider default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Voice identifier for audio output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Natural-language system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,

    /// Sampling temperature for response generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Microphone capture rate in Hz.
    pub input_sample_rate: u32,

    /// Playback rate in Hz for returned audio.
    pub output_sample_rate: u32,

    /// Samples per captured block handed to the encoder.
    pub capture_block_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: None,
            voice: None,
            instruction: None,
            temperature: None,
            input_sample_rate: DEFAULT_INPUT_SAMPLE_RATE,
            output_sample_rate: DEFAULT_OUTPUT_SAMPLE_RATE,
            capture_block_size: DEFAULT_CAPTURE_BLOCK_SIZE,
        }
    }
}

impl LiveConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the system instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the capture sample rate.
    pub fn with_input_sample_rate(mut self, rate: u32) -> Self {
        self.input_sample_rate = rate;
        self
    }

    /// Set the playback sample rate.
    pub fn with_output_sample_rate(mut self, rate: u32) -> Self {
        self.output_sample_rate = rate;
        self
    }

    /// Set the capture block size.
    pub fn with_capture_block_size(mut self, samples: usize) -> Self {
        self.capture_block_size = samples;
        self
    }
}
