//! Gemini Live model factory.

use crate::config::LiveConfig;
use crate::error::Result;
use crate::session::{BoxedSession, LiveModel};
use async_trait::async_trait;
use secrecy::SecretString;

use super::session::GeminiLiveSession;
use super::{DEFAULT_LIVE_MODEL, GEMINI_VOICES};

/// Factory for Gemini Live sessions.
///
/// Holds the API key (never logged) and the model identifier.
pub struct GeminiLiveModel {
    api_key: SecretString,
    model_id: String,
}

impl GeminiLiveModel {
    /// Create a new Gemini Live model.
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self { api_key: SecretString::from(api_key.into()), model_id: model_id.into() }
    }

    /// Create with the default live model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_LIVE_MODEL)
    }
}

#[async_trait]
impl LiveModel for GeminiLiveModel {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn available_voices(&self) -> Vec<&str> {
        GEMINI_VOICES.to_vec()
    }

    async fn open(&self, config: LiveConfig) -> Result<BoxedSession> {
        let model_id = config.model.as_deref().unwrap_or(&self.model_id);
        let session = GeminiLiveSession::connect(&self.api_key, model_id, &config).await?;
        Ok(Box::new(session))
    }
}

impl std::fmt::Debug for GeminiLiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveModel").field("model_id", &self.model_id).finish()
    }
}
