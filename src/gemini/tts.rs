//! One-shot Gemini text-to-speech over REST.

use crate::codec::{self, AudioChunk};
use crate::config::DEFAULT_OUTPUT_SAMPLE_RATE;
use crate::error::{Result, VoiceError};
use crate::synth::SpeechSynthesizer;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::{DEFAULT_TTS_MODEL, REST_BASE_URL};

/// One-shot speech synthesis via the Gemini `generateContent` endpoint.
///
/// Stateless: each call is an independent request and leaves nothing behind.
pub struct GeminiSynthesizer {
    api_key: SecretString,
    model_id: String,
    http: reqwest::Client,
}

impl GeminiSynthesizer {
    /// Create a new synthesizer.
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model_id: model_id.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Create with the default TTS model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_TTS_MODEL)
    }

    fn endpoint(&self) -> String {
        format!("{REST_BASE_URL}/models/{}:generateContent", self.model_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioChunk> {
        let request = json!({
            "contents": [{
                "parts": [{ "text": text }]
            }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice }
                    }
                }
            }
        });

        tracing::debug!(model_id = %self.model_id, voice = %voice, "requesting speech synthesis");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::synthesis(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::synthesis(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VoiceError::synthesis(format!("invalid response body: {e}")))?;

        let payload = extract_audio_payload(&body)
            .ok_or_else(|| VoiceError::synthesis("no audio payload in response".to_string()))?;

        codec::decode_base64_frame(payload, DEFAULT_OUTPUT_SAMPLE_RATE, 1)
    }
}

/// Pull the base64 audio payload out of a `generateContent` response.
fn extract_audio_payload(body: &Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("inlineData")?
        .get("data")?
        .as_str()
}

impl std::fmt::Debug for GeminiSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSynthesizer").field("model_id", &self.model_id).finish()
    }
}
