//! Gemini Live API provider.
//!
//! Implements the session and synthesis traits against Google's Gemini
//! endpoints: the WebSocket-based Live API for bidirectional audio and the
//! REST `generateContent` endpoint for one-shot text-to-speech.
//!
//! Audio formats are fixed by the API: 16 kHz mono PCM16 in, 24 kHz mono
//! PCM16 out.
//!
//! # Example
//!
//! ```rust,ignore
//! use voicepipe::gemini::GeminiLiveModel;
//! use voicepipe::{LiveConfig, LiveModel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = GeminiLiveModel::with_default_model(std::env::var("GOOGLE_API_KEY")?);
//!
//!     let config = LiveConfig::default()
//!         .with_voice("Zephyr")
//!         .with_instruction("You are a helpful assistant.");
//!
//!     let session = model.open(config).await?;
//!     // Stream audio through the session...
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

mod model;
mod session;
mod tts;

pub use model::GeminiLiveModel;
pub use session::GeminiLiveSession;
pub use tts::GeminiSynthesizer;

/// Gemini Live API WebSocket endpoint.
pub const LIVE_WS_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Base URL for the Gemini REST API.
pub const REST_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for live bidirectional audio.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Default model for one-shot text-to-speech.
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Available prebuilt voices (varies by model).
pub const GEMINI_VOICES: &[&str] = &["Zephyr", "Puck", "Charon", "Kore", "Fenrir", "Aoede"];

/// Default voice for live sessions.
pub const DEFAULT_LIVE_VOICE: &str = "Zephyr";

/// Default voice for one-shot synthesis.
pub const DEFAULT_TTS_VOICE: &str = "Kore";
