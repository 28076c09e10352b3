//! Live voice call demo.
//!
//! Opens a bidirectional Gemini Live session against the default microphone
//! and speaker, streams until Ctrl-C, then tears everything down.
//!
//! # Usage
//!
//! ```bash
//! export GOOGLE_API_KEY="your-api-key"
//! cargo run --example live_voice --features "gemini desktop-audio"
//! ```

use std::sync::Arc;
use tracing::{error, info};
use voicepipe::desktop::{DesktopCaptureDevice, DesktopOutputDevice};
use voicepipe::gemini::GeminiLiveModel;
use voicepipe::{LiveConfig, LiveController, SessionState, StatusHandler};

struct PrintStatus;

impl StatusHandler for PrintStatus {
    fn on_state_change(&self, state: &SessionState) {
        info!(status = %state, "session status");
    }
}

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

    let controller = LiveController::builder()
        .model(Arc::new(GeminiLiveModel::with_default_model(api_key)))
        .capture(Arc::new(DesktopCaptureDevice::new()))
        .output(Arc::new(DesktopOutputDevice::new()))
        .config(
            LiveConfig::default()
                .with_voice("Zephyr")
                .with_instruction("You are a friendly assistant. Respond naturally and concisely."),
        )
        .status_handler(PrintStatus)
        .build()?;

    info!("starting live session — speak into the microphone, Ctrl-C to hang up");
    if let Err(err) = controller.start().await {
        error!(error = %err, "failed to start live session");
        return Err(err.into());
    }

    tokio::signal::ctrl_c().await?;
    info!("hanging up");
    controller.stop().await;

    Ok(())
}
