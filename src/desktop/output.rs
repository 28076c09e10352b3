//! Scheduled playback via cpal.

use crate::codec::AudioChunk;
use crate::device::{DeviceContext, OutputDevice};
use crate::error::{Result, VoiceError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Output device using the default system speaker.
#[derive(Debug, Clone, Default)]
pub struct DesktopOutputDevice;

impl DesktopOutputDevice {
    /// Create a new output device handle.
    pub fn new() -> Self {
        Self
    }
}

/// A chunk queued for playback at an absolute frame position.
struct ScheduledChunk {
    start_frame: u64,
    samples: Vec<f32>,
}

/// State shared between the context handle and the stream callback.
struct PlaybackState {
    frames_played: AtomicU64,
    queue: Mutex<Vec<ScheduledChunk>>,
}

struct DesktopContext {
    sample_rate: u32,
    state: Arc<PlaybackState>,
    // Dropping the sender tells the stream thread to exit.
    shutdown: Mutex<Option<std::sync::mpsc::Sender<()>>>,
}

impl DeviceContext for DesktopContext {
    fn current_time(&self) -> f64 {
        self.state.frames_played.load(Ordering::SeqCst) as f64 / self.sample_rate as f64
    }

    fn schedule(&self, chunk: &AudioChunk, start_at: f64) -> Result<()> {
        if self.shutdown.lock().is_none() {
            return Err(VoiceError::SessionClosed);
        }
        if chunk.sample_rate != self.sample_rate {
            warn!(
                chunk_rate = chunk.sample_rate,
                device_rate = self.sample_rate,
                "scheduling chunk at a mismatched sample rate"
            );
        }
        let start_frame = (start_at.max(0.0) * self.sample_rate as f64).round() as u64;
        self.state
            .queue
            .lock()
            .push(ScheduledChunk { start_frame, samples: chunk.samples.clone() });
        Ok(())
    }

    fn close(&self) {
        self.shutdown.lock().take();
    }
}

#[async_trait]
impl OutputDevice for DesktopOutputDevice {
    async fn open(&self, sample_rate: u32) -> Result<Box<dyn DeviceContext>> {
        let state = Arc::new(PlaybackState {
            frames_played: AtomicU64::new(0),
            queue: Mutex::new(Vec::new()),
        });

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        let callback_state = state.clone();

        std::thread::Builder::new()
            .name("voicepipe-playback".to_string())
            .spawn(move || match build_output_stream(sample_rate, callback_state) {
                Ok(stream) => {
                    if let Err(err) = stream.play() {
                        let _ = ready_tx
                            .send(Err(VoiceError::device(format!("playback start failed: {err}"))));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    let _ = shutdown_rx.recv();
                    debug!("playback thread exiting, output device released");
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| VoiceError::device(format!("failed to spawn playback thread: {e}")))?;

        ready_rx
            .await
            .map_err(|_| VoiceError::device("playback thread exited unexpectedly"))??;

        Ok(Box::new(DesktopContext {
            sample_rate,
            state,
            shutdown: Mutex::new(Some(shutdown_tx)),
        }))
    }
}

fn build_output_stream(sample_rate: u32, state: Arc<PlaybackState>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| VoiceError::device("no output device available"))?;

    let channels = device.default_output_config().map(|c| c.channels()).unwrap_or(2) as usize;
    let config = cpal::StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = (data.len() / channels) as u64;
                let base = state.frames_played.load(Ordering::SeqCst);
                data.fill(0.0);

                let mut queue = state.queue.lock();
                for chunk in queue.iter() {
                    let chunk_end = chunk.start_frame + chunk.samples.len() as u64;
                    let begin = chunk.start_frame.max(base);
                    let end = chunk_end.min(base + frames);
                    for abs in begin..end {
                        let sample = chunk.samples[(abs - chunk.start_frame) as usize];
                        let dst = (abs - base) as usize * channels;
                        for slot in &mut data[dst..dst + channels] {
                            *slot += sample;
                        }
                    }
                }
                queue.retain(|chunk| {
                    chunk.start_frame + chunk.samples.len() as u64 > base + frames
                });
                drop(queue);

                state.frames_played.fetch_add(frames, Ordering::SeqCst);
            },
            |err| warn!(error = %err, "playback stream error"),
            None,
        )
        .map_err(|e| VoiceError::device(format!("failed to build playback stream: {e}")))?;

    Ok(stream)
}
