//! Controller lifecycle tests over scripted devices and sessions.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use voicepipe::{
    AudioChunk, CaptureDevice, CaptureStream, DeviceContext, LiveConfig, LiveController,
    LiveModel, LiveSession, OutputDevice, Result, SessionEvent, SessionState, StatusHandler,
    VoiceError, WireFrame, decode_frame,
};

// ── Scripted session ────────────────────────────────────────────────────

enum ScriptItem {
    Event(SessionEvent),
    Fail(VoiceError),
}

struct FakeSessionInner {
    connected: AtomicBool,
    sent: Mutex<Vec<WireFrame>>,
    inbound: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<ScriptItem>>,
    close_calls: AtomicUsize,
}

#[derive(Clone)]
struct FakeSession(Arc<FakeSessionInner>);

impl FakeSession {
    fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<ScriptItem>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let session = Self(Arc::new(FakeSessionInner {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            inbound: tokio::sync::Mutex::new(rx),
            close_calls: AtomicUsize::new(0),
        }));
        (session, tx)
    }

    fn sent_frames(&self) -> Vec<WireFrame> {
        self.0.sent.lock().clone()
    }

    fn close_count(&self) -> usize {
        self.0.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveSession for FakeSession {
    fn session_id(&self) -> &str {
        "fake-session"
    }

    fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }

    async fn send_frame(&self, frame: &WireFrame) -> Result<()> {
        self.0.sent.lock().push(frame.clone());
        Ok(())
    }

    async fn send_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn next_event(&self) -> Option<Result<SessionEvent>> {
        let mut inbound = self.0.inbound.lock().await;
        match inbound.recv().await {
            Some(ScriptItem::Event(event)) => Some(Ok(event)),
            Some(ScriptItem::Fail(err)) => Some(Err(err)),
            None => {
                self.0.connected.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    fn events(&self) -> Pin<Box<dyn Stream<Item = Result<SessionEvent>> + Send + '_>> {
        Box::pin(futures::stream::unfold(self, |session| async move {
            let event = session.next_event().await?;
            Some((event, session))
        }))
    }

    async fn close(&self) -> Result<()> {
        self.0.connected.store(false, Ordering::SeqCst);
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeModel {
    session: FakeSession,
    fail_with: Mutex<Option<VoiceError>>,
    opens: AtomicUsize,
}

impl FakeModel {
    fn new(session: FakeSession) -> Self {
        Self { session, fail_with: Mutex::new(None), opens: AtomicUsize::new(0) }
    }

    fn failing(session: FakeSession, err: VoiceError) -> Self {
        Self { session, fail_with: Mutex::new(Some(err)), opens: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LiveModel for FakeModel {
    fn provider(&self) -> &str {
        "fake"
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }

    fn available_voices(&self) -> Vec<&str> {
        vec!["Test"]
    }

    async fn open(&self, _config: LiveConfig) -> Result<voicepipe::BoxedSession> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().take() {
            return Err(err);
        }
        Ok(Box::new(self.session.clone()))
    }
}

// ── Scripted capture device ─────────────────────────────────────────────

struct FakeCaptureStream {
    sample_rate: u32,
    blocks: tokio::sync::mpsc::UnboundedReceiver<Vec<f32>>,
    // Keeps the channel open so the stream pends instead of ending.
    _hold: Option<tokio::sync::mpsc::UnboundedSender<Vec<f32>>>,
    released: Arc<AtomicBool>,
}

impl Drop for FakeCaptureStream {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureStream for FakeCaptureStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn next_block(&mut self) -> Option<Vec<f32>> {
        self.blocks.recv().await
    }
}

struct FakeCaptureDevice {
    script: Mutex<Vec<Vec<f32>>>,
    hold_open: bool,
    fail_with: Mutex<Option<VoiceError>>,
    released: Arc<AtomicBool>,
}

impl FakeCaptureDevice {
    fn new(script: Vec<Vec<f32>>, hold_open: bool) -> Self {
        Self {
            script: Mutex::new(script),
            hold_open,
            fail_with: Mutex::new(None),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    fn failing(err: VoiceError) -> Self {
        let device = Self::new(Vec::new(), false);
        *device.fail_with.lock() = Some(err);
        device
    }

    fn mic_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for FakeCaptureDevice {
    async fn request_microphone(
        &self,
        sample_rate: u32,
        _block_size: usize,
    ) -> Result<Box<dyn CaptureStream>> {
        if let Some(err) = self.fail_with.lock().take() {
            return Err(err);
        }
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        for block in self.script.lock().drain(..) {
            let _ = tx.send(block);
        }
        Ok(Box::new(FakeCaptureStream {
            sample_rate,
            blocks: rx,
            _hold: self.hold_open.then_some(tx),
            released: self.released.clone(),
        }))
    }
}

// ── Scripted output device ──────────────────────────────────────────────

#[derive(Default)]
struct FakeContextState {
    clock: Mutex<f64>,
    scheduled: Mutex<Vec<(f64, f64)>>,
    close_calls: AtomicUsize,
}

struct FakeContext(Arc<FakeContextState>);

impl DeviceContext for FakeContext {
    fn current_time(&self) -> f64 {
        *self.0.clock.lock()
    }

    fn schedule(&self, chunk: &AudioChunk, start_at: f64) -> Result<()> {
        self.0.scheduled.lock().push((start_at, chunk.duration_secs()));
        Ok(())
    }

    fn close(&self) {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeOutputDevice {
    state: Arc<FakeContextState>,
    opens: AtomicUsize,
    fail_with: Mutex<Option<VoiceError>>,
}

impl FakeOutputDevice {
    fn failing(err: VoiceError) -> Self {
        let device = Self::default();
        *device.fail_with.lock() = Some(err);
        device
    }

    fn scheduled(&self) -> Vec<(f64, f64)> {
        self.state.scheduled.lock().clone()
    }

    fn close_count(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputDevice for FakeOutputDevice {
    async fn open(&self, _sample_rate: u32) -> Result<Box<dyn DeviceContext>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().take() {
            return Err(err);
        }
        Ok(Box::new(FakeContext(self.state.clone())))
    }
}

// ── Status recording ────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct StatusRecorder(Arc<Mutex<Vec<SessionState>>>);

impl StatusHandler for StatusRecorder {
    fn on_state_change(&self, state: &SessionState) {
        self.0.lock().push(state.clone());
    }
}

impl StatusRecorder {
    fn states(&self) -> Vec<SessionState> {
        self.0.lock().clone()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn pcm_bytes(samples: usize) -> Bytes {
    Bytes::from(vec![0u8; samples * 2])
}

async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

struct Rig {
    controller: LiveController,
    session: FakeSession,
    capture: Arc<FakeCaptureDevice>,
    output: Arc<FakeOutputDevice>,
    status: StatusRecorder,
}

fn rig_with(
    capture: FakeCaptureDevice,
    model: FakeModel,
    output: FakeOutputDevice,
) -> Rig {
    let session = model.session.clone();
    let capture = Arc::new(capture);
    let output = Arc::new(output);
    let status = StatusRecorder::default();
    let controller = LiveController::builder()
        .model(Arc::new(model))
        .capture(capture.clone())
        .output(output.clone())
        .config(LiveConfig::default())
        .status_handler(status.clone())
        .build()
        .expect("controller builds");
    Rig { controller, session, capture, output, status }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn stop_from_idle_is_a_noop() {
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.stop().await;

    assert_eq!(rig.controller.state(), SessionState::Idle);
    assert!(rig.status.states().is_empty());
    assert_eq!(rig.output.close_count(), 0);
    assert_eq!(rig.session.close_count(), 0);
}

#[tokio::test]
async fn stop_from_active_releases_everything_exactly_once() {
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");
    assert!(rig.controller.is_active());

    rig.controller.stop().await;

    assert_eq!(rig.controller.state(), SessionState::Closed);
    assert!(rig.capture.mic_released());
    assert_eq!(rig.session.close_count(), 1);
    assert_eq!(rig.output.close_count(), 1);

    // A second stop has nothing left to release.
    rig.controller.stop().await;
    assert_eq!(rig.session.close_count(), 1);
    assert_eq!(rig.output.close_count(), 1);

    assert_eq!(
        rig.status.states(),
        vec![
            SessionState::Connecting,
            SessionState::Active,
            SessionState::Closing,
            SessionState::Closed,
        ]
    );
}

#[tokio::test]
async fn capture_blocks_are_encoded_and_sent_in_order() {
    let blocks: Vec<Vec<f32>> =
        (0..3).map(|i| vec![(i as f32 + 1.0) * 0.1; 4096]).collect();
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(blocks, true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");
    assert!(wait_until(|| rig.session.sent_frames().len() == 3).await);

    let frames = rig.session.sent_frames();
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.mime_type, "audio/pcm;rate=16000");
        assert_eq!(frame.sample_count(), 4096);
        let chunk = decode_frame(&frame.data, 16000, 1).unwrap();
        let expected = (i as f32 + 1.0) * 0.1;
        assert!(
            (chunk.samples[0] - expected).abs() <= 1.0 / 32767.0,
            "frame {i} out of order"
        );
    }

    rig.controller.stop().await;
}

#[tokio::test]
async fn inbound_audio_is_scheduled_back_to_back() {
    let (session, inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");

    // 12000 samples at 24kHz = 0.5s, then 6000 samples = 0.25s.
    inbound.send(ScriptItem::Event(SessionEvent::Audio(pcm_bytes(12000)))).unwrap();
    inbound.send(ScriptItem::Event(SessionEvent::Audio(pcm_bytes(6000)))).unwrap();

    assert!(wait_until(|| rig.output.scheduled().len() == 2).await);
    let scheduled = rig.output.scheduled();
    let (start1, d1) = scheduled[0];
    let (start2, _d2) = scheduled[1];
    assert_eq!(d1, 0.5);
    assert_eq!(start2, start1 + d1);

    rig.controller.stop().await;
}

#[tokio::test]
async fn malformed_inbound_chunk_is_skipped_without_ending_session() {
    let (session, inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");

    inbound
        .send(ScriptItem::Event(SessionEvent::Audio(Bytes::from_static(&[0, 1, 2]))))
        .unwrap();
    inbound.send(ScriptItem::Event(SessionEvent::Audio(pcm_bytes(6000)))).unwrap();

    assert!(wait_until(|| rig.output.scheduled().len() == 1).await);
    assert!(rig.controller.is_active());

    rig.controller.stop().await;
}

#[tokio::test]
async fn permission_denied_surfaces_as_error_state() {
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::failing(VoiceError::permission("denied by user")),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    let err = rig.controller.start().await.unwrap_err();
    assert!(matches!(err, VoiceError::PermissionDenied(_)));

    match rig.controller.state() {
        SessionState::Error(msg) => assert!(msg.contains("denied by user")),
        other => panic!("expected error state, got {other:?}"),
    }
    assert_eq!(rig.status.states()[0], SessionState::Connecting);
    assert_eq!(rig.output.open_count(), 0);
}

#[tokio::test]
async fn device_open_failure_releases_microphone() {
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::failing(VoiceError::device("no speaker")),
    );

    let err = rig.controller.start().await.unwrap_err();
    assert!(matches!(err, VoiceError::DeviceOpenFailure(_)));
    assert!(rig.capture.mic_released());
    assert!(matches!(rig.controller.state(), SessionState::Error(_)));
}

#[tokio::test]
async fn session_open_failure_releases_partial_resources() {
    let (session, _inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::failing(session, VoiceError::session_open("refused")),
        FakeOutputDevice::default(),
    );

    let err = rig.controller.start().await.unwrap_err();
    assert!(matches!(err, VoiceError::SessionOpenFailure(_)));
    assert!(rig.capture.mic_released());
    assert_eq!(rig.output.close_count(), 1);
    assert!(matches!(rig.controller.state(), SessionState::Error(_)));
}

#[tokio::test]
async fn remote_close_moves_to_closed_and_releases() {
    let (session, inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");
    drop(inbound);

    assert!(wait_until(|| rig.controller.state() == SessionState::Closed).await);
    assert!(rig.capture.mic_released());
    assert_eq!(rig.output.close_count(), 1);
}

#[tokio::test]
async fn remote_error_moves_to_error_and_releases() {
    let (session, inbound) = FakeSession::new();
    let rig = rig_with(
        FakeCaptureDevice::new(Vec::new(), true),
        FakeModel::new(session),
        FakeOutputDevice::default(),
    );

    rig.controller.start().await.expect("start succeeds");
    inbound.send(ScriptItem::Fail(VoiceError::session("stream reset"))).unwrap();

    assert!(
        wait_until(|| matches!(rig.controller.state(), SessionState::Error(_))).await
    );
    match rig.controller.state() {
        SessionState::Error(msg) => assert!(msg.contains("stream reset")),
        other => panic!("expected error state, got {other:?}"),
    }
    assert!(rig.capture.mic_released());
    assert_eq!(rig.output.close_count(), 1);
}

#[tokio::test]
async fn restart_after_stop_opens_a_fresh_session() {
    let (session, _inbound) = FakeSession::new();
    let model = FakeModel::new(session);
    let rig = rig_with(FakeCaptureDevice::new(Vec::new(), true), model, FakeOutputDevice::default());

    rig.controller.start().await.expect("first start");
    rig.controller.stop().await;
    rig.controller.start().await.expect("second start");

    assert!(rig.controller.is_active());
    rig.controller.stop().await;
    assert_eq!(rig.session.close_count(), 2);
}
