//! Microphone capture via cpal.

use crate::device::{CaptureDevice, CaptureStream};
use crate::error::{Result, VoiceError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capture device using the default system microphone.
#[derive(Debug, Clone, Default)]
pub struct DesktopCaptureDevice;

impl DesktopCaptureDevice {
    /// Create a new capture device handle.
    pub fn new() -> Self {
        Self
    }
}

struct DesktopCaptureStream {
    sample_rate: u32,
    blocks: mpsc::UnboundedReceiver<Vec<f32>>,
    // Dropping this sender tells the stream thread to exit, which drops the
    // cpal stream and releases the microphone.
    _shutdown: std::sync::mpsc::Sender<()>,
}

#[async_trait]
impl CaptureStream for DesktopCaptureStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn next_block(&mut self) -> Option<Vec<f32>> {
        self.blocks.recv().await
    }
}

#[async_trait]
impl CaptureDevice for DesktopCaptureDevice {
    async fn request_microphone(
        &self,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Box<dyn CaptureStream>> {
        if block_size == 0 {
            return Err(VoiceError::config("capture block size must be non-zero"));
        }

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (block_tx, block_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("voicepipe-capture".to_string())
            .spawn(move || match build_input_stream(sample_rate, block_size, block_tx) {
                Ok(stream) => {
                    if let Err(err) = stream.play() {
                        let _ = ready_tx
                            .send(Err(VoiceError::device(format!("capture start failed: {err}"))));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    // Park until the async side drops its handle.
                    let _ = shutdown_rx.recv();
                    debug!("capture thread exiting, microphone released");
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| VoiceError::device(format!("failed to spawn capture thread: {e}")))?;

        ready_rx
            .await
            .map_err(|_| VoiceError::device("capture thread exited unexpectedly"))??;

        Ok(Box::new(DesktopCaptureStream {
            sample_rate,
            blocks: block_rx,
            _shutdown: shutdown_tx,
        }))
    }
}

fn build_input_stream(
    sample_rate: u32,
    block_size: usize,
    blocks: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        VoiceError::permission("no input device available (microphone access may be disabled)")
    })?;

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut pending: Vec<f32> = Vec::with_capacity(block_size);
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);
                while pending.len() >= block_size {
                    let block: Vec<f32> = pending.drain(..block_size).collect();
                    if blocks.send(block).is_err() {
                        // Receiver gone; the stream is about to be torn down.
                        return;
                    }
                }
            },
            |err| warn!(error = %err, "capture stream error"),
            None,
        )
        .map_err(map_build_error)?;

    Ok(stream)
}

fn map_build_error(err: cpal::BuildStreamError) -> VoiceError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            VoiceError::permission("microphone not available or access denied")
        }
        other => VoiceError::device(format!("failed to build capture stream: {other}")),
    }
}
