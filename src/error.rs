//! Error types for the voice pipeline.

use thiserror::Error;

/// Result type for voice pipeline operations.
pub type Result<T> = std::result::Result<T, VoiceError>;

/// Errors that can occur in the voice pipeline.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Microphone access was refused by the user or the platform.
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    /// An audio device context could not be created.
    #[error("Audio device open failure: {0}")]
    DeviceOpenFailure(String),

    /// The remote bidirectional session failed to open.
    #[error("Session open failure: {0}")]
    SessionOpenFailure(String),

    /// The remote session errored after opening.
    #[error("Session error: {0}")]
    SessionError(String),

    /// A PCM16 byte sequence had an incomplete trailing sample.
    #[error("Malformed audio data: {0}")]
    MalformedAudioData(String),

    /// One-shot speech synthesis returned no payload or the call failed.
    #[error("Speech synthesis failure: {0}")]
    SynthesisFailure(String),

    /// WebSocket or HTTP connection error.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Malformed or unexpected wire message.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Operation attempted without an open session.
    #[error("Session not connected")]
    NotConnected,

    /// Operation attempted on a closed session or device context.
    #[error("Session already closed")]
    SessionClosed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl VoiceError {
    /// Create a new permission-denied error.
    pub fn permission<S: Into<String>>(msg: S) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a new device-open error.
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::DeviceOpenFailure(msg.into())
    }

    /// Create a new session-open error.
    pub fn session_open<S: Into<String>>(msg: S) -> Self {
        Self::SessionOpenFailure(msg.into())
    }

    /// Create a new session error.
    pub fn session<S: Into<String>>(msg: S) -> Self {
        Self::SessionError(msg.into())
    }

    /// Create a new malformed-audio error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedAudioData(msg.into())
    }

    /// Create a new synthesis error.
    pub fn synthesis<S: Into<String>>(msg: S) -> Self {
        Self::SynthesisFailure(msg.into())
    }

    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }
}
