//! Microphone capture on a dedicated thread (cpal streams are not `Send`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::{LinearResampler, to_mono};
use crate::error::{AssistantError, Result};

const DEVICE_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running capture. Samples are mono at the rate passed to [`start`].
///
/// Dropping the session stops the stream without waiting for the thread.
pub struct CaptureSession {
    running: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<f32>>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("samples", &self.len())
            .finish()
    }
}

impl CaptureSession {
    /// Samples captured so far.
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the samples captured after index `from`.
    pub fn samples_from(&self, from: usize) -> Vec<f32> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.get(from..).map(<[f32]>::to_vec).unwrap_or_default()
    }

    /// Stop the stream, join the thread and take the recording. Blocks.
    pub fn stop(mut self) -> Vec<f32> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("capture thread panicked");
        }
        std::mem::take(&mut *self.samples.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Open the input device on a new thread and start collecting samples,
/// resampled to `target_rate`. Returns once the stream is playing. Blocks.
///
/// # Errors
///
/// Returns an error if the device cannot be found or opened.
pub fn start(device_name: Option<String>, target_rate: u32) -> Result<CaptureSession> {
    let running = Arc::new(AtomicBool::new(true));
    let samples = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&samples);
    let flag = Arc::clone(&running);
    let (ready_tx, ready_rx) = sync_channel::<std::result::Result<(), String>>(1);

    let thread = std::thread::Builder::new()
        .name("audio-capture".into())
        .spawn(move || {
            let stream = match open_stream(device_name.as_deref(), target_rate, sink, &flag) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            while flag.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
            info!("audio capture stopped");
        })
        .map_err(|e| AssistantError::Audio(format!("cannot spawn capture thread: {e}")))?;

    let mut session = CaptureSession {
        running,
        samples,
        thread: Some(thread),
    };
    match ready_rx.recv_timeout(DEVICE_OPEN_TIMEOUT) {
        Ok(Ok(())) => Ok(session),
        Ok(Err(e)) => {
            if let Some(thread) = session.thread.take() {
                let _ = thread.join();
            }
            Err(AssistantError::Audio(e))
        }
        Err(RecvTimeoutError::Timeout) => Err(AssistantError::Audio(
            "timed out opening the input device".to_owned(),
        )),
        Err(RecvTimeoutError::Disconnected) => Err(AssistantError::Audio(
            "capture thread exited before the device opened".to_owned(),
        )),
    }
}

fn open_stream(
    device_name: Option<&str>,
    target_rate: u32,
    sink: Arc<Mutex<Vec<f32>>>,
    running: &Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| format!("cannot enumerate input devices: {e}"))?
            .find(|d| {
                d.description()
                    .ok()
                    .map(|desc| desc.name() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("input device '{name}' not found"))?,
        None => host
            .default_input_device()
            .ok_or_else(|| "no default input device".to_owned())?,
    };

    let default_config = device
        .default_input_config()
        .map_err(|e| format!("no default input config: {e}"))?;
    let native_rate = default_config.sample_rate();
    let native_channels = default_config.channels();
    let stream_config = StreamConfig {
        channels: native_channels,
        sample_rate: native_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    info!(native_rate, native_channels, target_rate, "opening audio capture");

    let flag = Arc::clone(running);
    let mut resampler = LinearResampler::new(native_rate, target_rate);
    let mut chunk = Vec::new();
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                if !flag.load(Ordering::Relaxed) {
                    return;
                }
                chunk.clear();
                resampler.process(&to_mono(data, native_channels), &mut chunk);
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(&chunk);
            },
            move |err| error!("audio capture stream error: {err}"),
            None,
        )
        .map_err(|e| format!("failed to build input stream: {e}"))?;
    stream
        .play()
        .map_err(|e| format!("failed to start input stream: {e}"))?;
    Ok(stream)
}
