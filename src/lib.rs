//! # voicepipe
//!
//! Real-time bidirectional voice streaming pipeline for conversational
//! model APIs.
//!
//! The crate captures microphone audio in fixed-size floating-point blocks,
//! frames it as little-endian 16-bit PCM for a streaming API, manages the
//! live session's lifecycle, and decodes/schedules returned audio chunks
//! for gapless playback. A separate stateless one-shot speech-synthesis
//! path reuses the codec but none of the session state.
//!
//! ## Architecture
//!
//! ```text
//!   microphone ──► CaptureStream ──► encode_frame ──► LiveSession ──► model
//!                                                        │
//!   speaker ◄── DeviceContext ◄── PlaybackScheduler ◄── decode_frame
//! ```
//!
//! [`LiveController`] owns every resource of one session — capture stream,
//! session handle, output context — behind a single lock, so teardown is
//! atomic and the state machine (Idle → Connecting → Active → Closed/Error)
//! is explicit rather than scattered across callbacks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voicepipe::gemini::GeminiLiveModel;
//! use voicepipe::desktop::{DesktopCaptureDevice, DesktopOutputDevice};
//! use voicepipe::{LiveConfig, LiveController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = LiveController::builder()
//!         .model(Arc::new(GeminiLiveModel::with_default_model(api_key)))
//!         .capture(Arc::new(DesktopCaptureDevice::new()))
//!         .output(Arc::new(DesktopOutputDevice::new()))
//!         .config(LiveConfig::default().with_voice("Zephyr"))
//!         .build()?;
//!
//!     controller.start().await?;
//!     // ... speak with the model ...
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod playback;
pub mod session;
pub mod synth;

// Provider implementations
#[cfg(feature = "gemini")]
pub mod gemini;

// Device implementations
#[cfg(feature = "desktop-audio")]
pub mod desktop;

// Re-exports
pub use codec::{AudioChunk, WireFrame, decode_base64_frame, decode_frame, encode_frame};
pub use config::LiveConfig;
pub use controller::{LiveController, LiveControllerBuilder, NoOpStatusHandler, SessionState, StatusHandler};
pub use device::{CaptureDevice, CaptureStream, DeviceContext, OutputDevice};
pub use error::{Result, VoiceError};
pub use playback::PlaybackScheduler;
pub use session::{BoxedModel, BoxedSession, LiveModel, LiveSession, SessionEvent};
pub use synth::{SpeechSynthesizer, speak_once};
