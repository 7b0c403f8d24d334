//! Audio playback to the system speakers via cpal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use super::{LinearResampler, Pcm};
use crate::error::{AssistantError, Result};

/// Somewhere to play audio.
pub trait AudioSink: Send + Sync {
    /// Play `pcm`, blocking until it has finished or `keep_playing` is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the output stream cannot be opened.
    fn play(&self, pcm: &Pcm, keep_playing: &AtomicBool) -> Result<()>;
}

/// Output device playback. The device is opened per utterance on the
/// calling thread.
#[derive(Debug, Clone, Default)]
pub struct CpalSink {
    device_name: Option<String>,
}

impl CpalSink {
    /// Sink for the named output device (None = system default).
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| AssistantError::Audio(format!("cannot enumerate devices: {e}")))?
                .find(|d| {
                    d.description()
                        .ok()
                        .map(|desc| desc.name() == name)
                        .unwrap_or(false)
                })
                .ok_or_else(|| AssistantError::Audio(format!("output device '{name}' not found"))),
            None => host
                .default_output_device()
                .ok_or_else(|| AssistantError::Audio("no default output device".into())),
        }
    }
}

impl AudioSink for CpalSink {
    fn play(&self, pcm: &Pcm, keep_playing: &AtomicBool) -> Result<()> {
        if pcm.is_empty() {
            return Ok(());
        }
        let device = self.device()?;
        let default_config = device
            .default_output_config()
            .map_err(|e| AssistantError::Audio(format!("no default output config: {e}")))?;
        let rate = default_config.sample_rate();
        let channels = usize::from(default_config.channels().max(1));
        let stream_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: rate,
            buffer_size: cpal::BufferSize::Default,
        };
        info!(rate, channels, secs = pcm.duration_secs(), "playing speech");

        let buffer = Arc::new(Mutex::new(PlaybackBuffer {
            samples: LinearResampler::resample(&pcm.samples, pcm.sample_rate, rate),
            position: 0,
            finished: false,
        }));
        let buffer_clone = Arc::clone(&buffer);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let Ok(mut buf) = buffer_clone.lock() else {
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let next = buf.samples.get(buf.position).copied();
                        let sample = match next {
                            Some(s) => {
                                buf.position += 1;
                                s
                            }
                            None => {
                                buf.finished = true;
                                0.0
                            }
                        };
                        frame.fill(sample);
                    }
                },
                move |err| error!("audio output stream error: {err}"),
                None,
            )
            .map_err(|e| AssistantError::Audio(format!("failed to build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| AssistantError::Audio(format!("failed to start output stream: {e}")))?;

        loop {
            std::thread::sleep(Duration::from_millis(10));
            if !keep_playing.load(Ordering::SeqCst) {
                debug!("playback interrupted");
                break;
            }
            if buffer.lock().unwrap_or_else(|e| e.into_inner()).finished {
                break;
            }
        }
        drop(stream);
        Ok(())
    }
}

struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}
