//! Gemini Live WebSocket session.

use crate::codec::WireFrame;
use crate::config::LiveConfig;
use crate::error::{Result, VoiceError};
use crate::session::{LiveSession, SessionEvent};
use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

// ── Client wire format ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realtime_input: Option<RealtimeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_content: Option<ClientContent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInput {
    media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaChunk {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientContent {
    turns: Vec<Turn>,
    turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Turn {
    role: String,
    parts: Vec<Part>,
}

impl ClientMessage {
    fn empty() -> Self {
        Self { setup: None, realtime_input: None, client_content: None }
    }
}

// ── Session ─────────────────────────────────────────────────────────────

/// A live bidirectional session over the Gemini Live WebSocket API.
pub struct GeminiLiveSession {
    session_id: String,
    connected: Arc<AtomicBool>,
    sender: Arc<Mutex<WsSink>>,
    receiver: Arc<Mutex<WsSource>>,
}

impl GeminiLiveSession {
    /// Connect and send the setup message.
    pub(crate) async fn connect(
        api_key: &SecretString,
        model: &str,
        config: &LiveConfig,
    ) -> Result<Self> {
        let mut url = Url::parse(super::LIVE_WS_URL)
            .map_err(|e| VoiceError::session_open(format!("invalid endpoint URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", api_key.expose_secret());

        let request = url.as_str().into_client_request().map_err(|e| {
            VoiceError::session_open(format!("failed to build client request: {e}"))
        })?;
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| VoiceError::session_open(format!("WebSocket connect error: {e}")))?;

        let (sink, source) = ws.split();
        let session = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            connected: Arc::new(AtomicBool::new(true)),
            sender: Arc::new(Mutex::new(sink)),
            receiver: Arc::new(Mutex::new(source)),
        };

        session.send_setup(model, config).await?;
        Ok(session)
    }

    /// Send the initial setup message.
    async fn send_setup(&self, model: &str, config: &LiveConfig) -> Result<()> {
        let mut generation_config = json!({
            "responseModalities": ["AUDIO"],
        });

        let voice = config.voice.as_deref().unwrap_or(super::DEFAULT_LIVE_VOICE);
        generation_config["speechConfig"] = json!({
            "voiceConfig": {
                "prebuiltVoiceConfig": {
                    "voiceName": voice
                }
            }
        });

        if let Some(temperature) = config.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        let system_instruction = config
            .instruction
            .clone()
            .map(|text| Content { parts: vec![Part { text: Some(text) }] });

        let setup = ClientMessage {
            setup: Some(Setup {
                model: model.to_string(),
                system_instruction,
                generation_config: Some(generation_config),
            }),
            ..ClientMessage::empty()
        };

        tracing::info!(model_id = %model, voice = %voice, "sending live setup message");
        self.send_raw(&setup).await
    }

    async fn send_raw<T: Serialize>(&self, value: &T) -> Result<()> {
        let msg = serde_json::to_string(value)?;

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(msg.into()))
            .await
            .map_err(|e| VoiceError::connection(format!("send error: {e}")))?;
        Ok(())
    }

    async fn receive_raw(&self) -> Option<Result<SessionEvent>> {
        let mut receiver = self.receiver.lock().await;

        match receiver.next().await {
            Some(Ok(Message::Text(text))) => Some(translate_server_message(&text)),
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => Some(translate_server_message(&text)),
                Err(e) => Some(Err(VoiceError::protocol(format!(
                    "invalid UTF-8 in binary message: {e}"
                )))),
            },
            Some(Ok(Message::Close(_))) => {
                self.connected.store(false, Ordering::SeqCst);
                None
            }
            Some(Ok(_)) => Some(Ok(SessionEvent::Unknown)),
            Some(Err(e)) => {
                self.connected.store(false, Ordering::SeqCst);
                Some(Err(VoiceError::connection(format!("receive error: {e}"))))
            }
            None => {
                self.connected.store(false, Ordering::SeqCst);
                None
            }
        }
    }
}

/// Translate one Gemini server message into a [`SessionEvent`].
///
/// Inbound base64 audio payloads are decoded here, at the transport
/// boundary, so consumers only ever deal with raw PCM bytes.
fn translate_server_message(raw: &str) -> Result<SessionEvent> {
    tracing::trace!(%raw, "translating server message");
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| VoiceError::protocol(format!("parse error: {e}")))?;

    if value.get("setupComplete").is_some() {
        return Ok(SessionEvent::Opened);
    }

    if let Some(go_away) = value.get("goAway") {
        return Err(VoiceError::session(format!("server closing connection: {go_away}")));
    }

    if let Some(content) = value.get("serverContent") {
        if content.get("turnComplete").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(SessionEvent::TurnComplete);
        }

        if let Some(parts) = content.get("modelTurn").and_then(|t| t.get("parts")) {
            if let Some(parts) = parts.as_array() {
                for part in parts {
                    if let Some(data) =
                        part.get("inlineData").and_then(|d| d.get("data")).and_then(Value::as_str)
                    {
                        let decoded = BASE64_STANDARD.decode(data).map_err(|e| {
                            VoiceError::protocol(format!("invalid base64 audio payload: {e}"))
                        })?;
                        return Ok(SessionEvent::Audio(Bytes::from(decoded)));
                    }
                    if let Some(text) = part.get("text").and_then(Value::as_str) {
                        return Ok(SessionEvent::Text(text.to_string()));
                    }
                }
            }
        }
    }

    Ok(SessionEvent::Unknown)
}

#[async_trait]
impl LiveSession for GeminiLiveSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_frame(&self, frame: &WireFrame) -> Result<()> {
        let msg = ClientMessage {
            realtime_input: Some(RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: frame.mime_type.clone(),
                    data: frame.to_base64(),
                }],
            }),
            ..ClientMessage::empty()
        };
        self.send_raw(&msg).await
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let msg = ClientMessage {
            client_content: Some(ClientContent {
                turns: vec![Turn {
                    role: "user".to_string(),
                    parts: vec![Part { text: Some(text.to_string()) }],
                }],
                turn_complete: true,
            }),
            ..ClientMessage::empty()
        };
        self.send_raw(&msg).await
    }

    async fn next_event(&self) -> Option<Result<SessionEvent>> {
        self.receive_raw().await
    }

    fn events(&self) -> Pin<Box<dyn Stream<Item = Result<SessionEvent>> + Send + '_>> {
        Box::pin(futures::stream::unfold(self, |session| async move {
            let event = session.receive_raw().await?;
            Some((event, session))
        }))
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Close(None))
            .await
            .map_err(|e| VoiceError::connection(format!("close error: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for GeminiLiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveSession")
            .field("session_id", &self.session_id)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}
