//! One-shot text-to-speech demo.
//!
//! Synthesizes the given text and plays it on the default speaker.
//!
//! # Usage
//!
//! ```bash
//! export GOOGLE_API_KEY="your-api-key"
//! cargo run --example speak --features "gemini desktop-audio" -- "Hello there"
//! ```

use tracing::info;
use voicepipe::desktop::DesktopOutputDevice;
use voicepipe::gemini::{DEFAULT_TTS_VOICE, GeminiSynthesizer};
use voicepipe::speak_once;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let api_key = std::env::var("GOOGLE_API_KEY")
        .map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY must be set"))?;
    let text = std::env::args().nth(1).unwrap_or_else(|| "Hello from voicepipe.".to_string());

    let synthesizer = GeminiSynthesizer::with_default_model(api_key);
    let output = DesktopOutputDevice::new();

    info!(voice = DEFAULT_TTS_VOICE, "synthesizing");
    speak_once(&synthesizer, &output, &text, DEFAULT_TTS_VOICE).await?;
    info!("done");

    Ok(())
}
