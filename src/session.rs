//! Live session traits and events.
//!
//! A [`LiveSession`] is a long-lived bidirectional channel streaming audio in
//! and out of a remote conversational model. [`LiveModel`] is the factory
//! that opens sessions. Audio payloads are base64-decoded at the transport
//! boundary, so consumers only ever see raw PCM bytes.

use crate::codec::WireFrame;
use crate::config::LiveConfig;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Events delivered by a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The remote end acknowledged the session setup.
    Opened,
    /// A chunk of output audio (raw PCM16 bytes, already base64-decoded).
    Audio(Bytes),
    /// A chunk of output text, for text-capable models.
    Text(String),
    /// The model finished its current turn.
    TurnComplete,
    /// Unrecognized message, kept for forward compatibility.
    Unknown,
}

/// A real-time bidirectional audio streaming session.
///
/// Frame sends are fire-and-forget: they are not retried or acknowledged,
/// and losing an individual frame degrades audio quality without ending the
/// session.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Get the session ID.
    fn session_id(&self) -> &str;

    /// Check if the session is currently connected.
    fn is_connected(&self) -> bool;

    /// Send one encoded audio frame to the remote end.
    async fn send_frame(&self, frame: &WireFrame) -> Result<()>;

    /// Send a text message as a completed user turn.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Get the next event from the remote end.
    ///
    /// Returns `None` once the session is closed.
    async fn next_event(&self) -> Option<Result<SessionEvent>>;

    /// Get a stream of session events.
    fn events(&self) -> Pin<Box<dyn Stream<Item = Result<SessionEvent>> + Send + '_>>;

    /// Close the session gracefully.
    async fn close(&self) -> Result<()>;
}

/// A factory for opening live sessions against one provider.
#[async_trait]
pub trait LiveModel: Send + Sync {
    /// Get the provider name (e.g. "gemini").
    fn provider(&self) -> &str;

    /// Get the model identifier.
    fn model_id(&self) -> &str;

    /// Get available output voices for this model.
    fn available_voices(&self) -> Vec<&str>;

    /// Open a new bidirectional session with the given configuration.
    async fn open(&self, config: LiveConfig) -> Result<BoxedSession>;
}

/// A boxed session type for dynamic dispatch.
pub type BoxedSession = Box<dyn LiveSession>;

/// A shared model type for thread-safe access.
pub type BoxedModel = std::sync::Arc<dyn LiveModel>;
