//! Live session lifecycle control.
//!
//! [`LiveController`] owns every mutable resource of one user-facing voice
//! session — the microphone stream, the output device context (via the
//! playback scheduler), the remote session handle, and the pump tasks — so
//! teardown releases them together and no callback can observe a
//! half-torn-down state.
//!
//! Capture blocks are encoded and sent fire-and-forget into the session;
//! inbound audio is decoded and handed to the [`PlaybackScheduler`]. The
//! state machine is: Idle → Connecting → Active → Closing → Closed, with
//! Error(message) terminal for the current run. There is no automatic
//! reconnection: a fresh `start()` is required after an error.

use crate::codec;
use crate::config::LiveConfig;
use crate::device::{CaptureDevice, CaptureStream, OutputDevice};
use crate::error::{Result, VoiceError};
use crate::playback::PlaybackScheduler;
use crate::session::{BoxedModel, LiveSession, SessionEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle state of a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No stream, no session.
    Idle,
    /// Acquiring the microphone, device contexts, and remote session.
    Connecting,
    /// Capture and playback are running.
    Active,
    /// Teardown in progress.
    Closing,
    /// Terminal; idle-equivalent for the purpose of a new `start()`.
    Closed,
    /// Terminal for this run; carries a human-readable message.
    Error(String),
}

impl SessionState {
    /// Whether the session has finished (normally or with an error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error(_))
    }

    /// Whether the session is connecting or actively streaming.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Active => write!(f, "active"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Observer for session state transitions.
///
/// Failures surface here as an [`SessionState::Error`] transition with a
/// human-readable message rather than as an unhandled fault.
pub trait StatusHandler: Send + Sync {
    /// Called on every state transition.
    fn on_state_change(&self, _state: &SessionState) {}
}

/// Default no-op status handler.
#[derive(Debug, Clone, Default)]
pub struct NoOpStatusHandler;

impl StatusHandler for NoOpStatusHandler {}

/// Resources of one running session, released together and exactly once.
struct ActiveParts {
    session: Arc<dyn LiveSession>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    uplink: JoinHandle<()>,
    downlink: Option<JoinHandle<()>>,
}

/// State shared between the controller and its pump tasks.
struct Shared {
    state: Mutex<SessionState>,
    handler: Arc<dyn StatusHandler>,
    parts: Mutex<Option<ActiveParts>>,
    stop_requested: AtomicBool,
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            *state = next.clone();
        }
        debug!(state = %next, "session state changed");
        self.handler.on_state_change(&next);
    }
}

/// Builder for [`LiveController`].
pub struct LiveControllerBuilder {
    model: Option<BoxedModel>,
    capture: Option<Arc<dyn CaptureDevice>>,
    output: Option<Arc<dyn OutputDevice>>,
    config: LiveConfig,
    handler: Option<Arc<dyn StatusHandler>>,
}

impl Default for LiveControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveControllerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            model: None,
            capture: None,
            output: None,
            config: LiveConfig::default(),
            handler: None,
        }
    }

    /// Set the session factory.
    pub fn model(mut self, model: BoxedModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the capture device.
    pub fn capture(mut self, capture: Arc<dyn CaptureDevice>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Set the output device.
    pub fn output(mut self, output: Arc<dyn OutputDevice>) -> Self {
        self.output = Some(output);
        self
    }

    /// Set the session configuration.
    pub fn config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the status handler.
    pub fn status_handler(mut self, handler: impl StatusHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<LiveController> {
        let model = self.model.ok_or_else(|| VoiceError::config("model is required"))?;
        let capture = self.capture.ok_or_else(|| VoiceError::config("capture device is required"))?;
        let output = self.output.ok_or_else(|| VoiceError::config("output device is required"))?;

        Ok(LiveController {
            model,
            capture,
            output,
            config: self.config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                handler: self.handler.unwrap_or_else(|| Arc::new(NoOpStatusHandler)),
                parts: Mutex::new(None),
                stop_requested: AtomicBool::new(false),
            }),
        })
    }
}

/// Controller for one live bidirectional voice session.
pub struct LiveController {
    model: BoxedModel,
    capture: Arc<dyn CaptureDevice>,
    output: Arc<dyn OutputDevice>,
    config: LiveConfig,
    shared: Arc<Shared>,
}

impl LiveController {
    /// Create a new builder.
    pub fn builder() -> LiveControllerBuilder {
        LiveControllerBuilder::new()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state.lock().clone()
    }

    /// Whether the session is actively streaming.
    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Active)
    }

    /// Start the session: acquire the microphone, open the output device,
    /// open the remote session, and begin pumping audio both ways.
    ///
    /// Any leftover resources from a previous run are torn down first, so a
    /// session can never leak. On failure the state moves to
    /// [`SessionState::Error`], already-acquired resources are released, and
    /// the error is also returned to the caller.
    pub async fn start(&self) -> Result<()> {
        let leftover = self.shared.parts.lock().take();
        if let Some(parts) = leftover {
            debug!("tearing down leftover session before start");
            release_parts(parts, false).await;
        }
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.set_state(SessionState::Connecting);

        let stream = match self
            .capture
            .request_microphone(self.config.input_sample_rate, self.config.capture_block_size)
            .await
        {
            Ok(stream) => stream,
            Err(err) => return self.fail_connecting(err),
        };
        if self.stop_requested() {
            drop(stream);
            self.shared.set_state(SessionState::Closed);
            return Ok(());
        }

        let ctx = match self.output.open(self.config.output_sample_rate).await {
            Ok(ctx) => ctx,
            Err(err) => {
                drop(stream);
                return self.fail_connecting(err);
            }
        };
        if self.stop_requested() {
            drop(stream);
            ctx.close();
            self.shared.set_state(SessionState::Closed);
            return Ok(());
        }

        let session: Arc<dyn LiveSession> = match self.model.open(self.config.clone()).await {
            Ok(session) => Arc::from(session),
            Err(err) => {
                drop(stream);
                ctx.close();
                return self.fail_connecting(err);
            }
        };
        if self.stop_requested() {
            if let Err(err) = session.close().await {
                debug!(error = %err, "close after cancelled connect failed");
            }
            drop(stream);
            ctx.close();
            self.shared.set_state(SessionState::Closed);
            return Ok(());
        }

        info!(session_id = session.session_id(), "live session open");

        let scheduler = Arc::new(Mutex::new(PlaybackScheduler::new(ctx)));
        let uplink = tokio::spawn(uplink_loop(stream, session.clone()));

        *self.shared.parts.lock() = Some(ActiveParts {
            session: session.clone(),
            scheduler: scheduler.clone(),
            uplink,
            downlink: None,
        });
        self.shared.set_state(SessionState::Active);

        let downlink = tokio::spawn(downlink_loop(
            session,
            scheduler,
            self.shared.clone(),
            self.config.output_sample_rate,
        ));
        {
            let mut guard = self.shared.parts.lock();
            match guard.as_mut() {
                Some(parts) => parts.downlink = Some(downlink),
                // stop() raced the spawn; the loop sees the closed session and exits.
                None => downlink.abort(),
            }
        }

        // A stop() that landed between the spawns above must still win.
        if self.stop_requested() {
            let taken = self.shared.parts.lock().take();
            if let Some(parts) = taken {
                release_parts(parts, false).await;
            }
            self.shared.set_state(SessionState::Closed);
        }

        Ok(())
    }

    /// Stop the session and release every resource, best-effort.
    ///
    /// Safe from any state, including mid-`Connecting`; never returns an
    /// error. A failure to close one resource does not prevent releasing the
    /// others. From `Idle` this is a no-op.
    pub async fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        let taken = self.shared.parts.lock().take();
        if let Some(parts) = taken {
            self.shared.set_state(SessionState::Closing);
            release_parts(parts, false).await;
            self.shared.set_state(SessionState::Closed);
        }
        // With nothing acquired (Idle, or an in-flight start() that will see
        // the flag) there is nothing to release and no state to change here.
    }

    fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    fn fail_connecting(&self, err: VoiceError) -> Result<()> {
        warn!(error = %err, "live session failed to start");
        self.shared.set_state(SessionState::Error(err.to_string()));
        Err(err)
    }
}

impl Drop for LiveController {
    fn drop(&mut self) {
        if let Some(parts) = self.shared.parts.lock().take() {
            parts.uplink.abort();
            if let Some(downlink) = parts.downlink {
                downlink.abort();
            }
            parts.scheduler.lock().close();
        }
    }
}

impl std::fmt::Debug for LiveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveController")
            .field("provider", &self.model.provider())
            .field("model_id", &self.model.model_id())
            .field("state", &self.state())
            .finish()
    }
}

/// Release one session's resources, exactly once each.
///
/// Individual failures are logged and swallowed: one failing resource must
/// not prevent releasing the others.
async fn release_parts(parts: ActiveParts, from_downlink: bool) {
    // Aborting the uplink drops the capture stream, releasing the microphone.
    parts.uplink.abort();
    let _ = parts.uplink.await;

    if let Err(err) = parts.session.close().await {
        debug!(error = %err, "session close failed during teardown");
    }
    parts.scheduler.lock().close();

    if !from_downlink {
        if let Some(downlink) = parts.downlink {
            downlink.abort();
        }
    }
}

/// Pump captured blocks through the encoder into the session.
///
/// Sends are fire-and-forget: a failed send loses one frame of audio but
/// never ends the session.
async fn uplink_loop(mut stream: Box<dyn CaptureStream>, session: Arc<dyn LiveSession>) {
    let sample_rate = stream.sample_rate();
    while let Some(block) = stream.next_block().await {
        let frame = codec::encode_frame(&block, sample_rate);
        if let Err(err) = session.send_frame(&frame).await {
            warn!(error = %err, "dropping outbound audio frame");
        }
    }
    debug!("capture stream ended");
}

/// Pump inbound session events into the playback scheduler.
async fn downlink_loop(
    session: Arc<dyn LiveSession>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    shared: Arc<Shared>,
    sample_rate: u32,
) {
    let terminal = loop {
        match session.next_event().await {
            Some(Ok(SessionEvent::Audio(data))) => {
                match codec::decode_frame(&data, sample_rate, 1) {
                    Ok(chunk) => {
                        if let Err(err) = scheduler.lock().enqueue(&chunk) {
                            warn!(error = %err, "failed to schedule inbound audio");
                        }
                    }
                    // A single corrupt frame is not a session-level fault.
                    Err(err) => warn!(error = %err, "dropping malformed audio chunk"),
                }
            }
            Some(Ok(SessionEvent::Opened)) => debug!("session setup acknowledged"),
            Some(Ok(SessionEvent::Text(text))) => debug!(text = %text, "inbound text"),
            Some(Ok(SessionEvent::TurnComplete)) => debug!("model turn complete"),
            Some(Ok(SessionEvent::Unknown)) => {}
            Some(Err(err)) => break SessionState::Error(err.to_string()),
            None => break SessionState::Closed,
        }
    };

    // The remote end closed or errored: release whatever this side still holds.
    let taken = shared.parts.lock().take();
    if let Some(parts) = taken {
        release_parts(parts, true).await;
    }
    info!(state = %terminal, "live session ended");
    shared.set_state(terminal);
}
