//! Meeting recording and transcription.
//!
//! `start_listening` starts an [`audio::capture`](crate::audio::capture)
//! session. `stop_listening` ends it, writes the audio to a temporary 16-bit
//! WAV, sends it to an OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint, asks the language model for a
//! summary and saves summary plus transcript to the meetings directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tracing::{debug, info};

use super::MeetingRecorder;
use crate::audio::{self, capture::CaptureSession};
use crate::config::MeetingConfig;
use crate::error::{AssistantError, Result};
use crate::llm::LanguageModel;

const TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Speech-to-text for a WAV file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav_path: &Path) -> Result<String>;
}

/// Multipart POST to `{base}/v1/audio/transcriptions` (OpenAI, whisper.cpp
/// server, faster-whisper-server, llama-server).
#[derive(Debug)]
pub struct HttpTranscriber {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl HttpTranscriber {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MeetingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(TRANSCRIPTION_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Meeting(format!("failed to build HTTP client: {e}")))?;
        let url = config.transcription_url.trim().trim_end_matches('/');
        Ok(Self {
            client,
            base_url: url.strip_suffix("/v1").unwrap_or(url).to_owned(),
            model: config.transcription_model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(wav_path).await?;
        let filename = wav_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_owned();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("audio/wav")
            .map_err(|e| AssistantError::Meeting(format!("invalid upload part: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", part);

        let mut request = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .multipart(form);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AssistantError::Meeting(format!("transcription request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Meeting(format!(
                "transcription server returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        let parsed: TranscriptionResponse = response.json().await.map_err(|e| {
            AssistantError::Meeting(format!("invalid transcription response: {e}"))
        })?;
        debug!(chars = parsed.text.len(), "transcription received");
        Ok(parsed.text.trim().to_owned())
    }
}

/// Records meetings from the input device and writes summaries.
pub struct MeetingTranscriber {
    listening: AtomicBool,
    session: Mutex<Option<CaptureSession>>,
    input_device: Option<String>,
    sample_rate: u32,
    transcriber: Arc<dyn Transcriber>,
    model: Arc<dyn LanguageModel>,
    output_dir: PathBuf,
}

impl std::fmt::Debug for MeetingTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeetingTranscriber")
            .field("listening", &self.is_listening())
            .field("sample_rate", &self.sample_rate)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl MeetingTranscriber {
    /// Recorder using the HTTP transcriber from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcription client cannot be built.
    pub fn new(
        config: &MeetingConfig,
        output_dir: PathBuf,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let transcriber = Arc::new(HttpTranscriber::new(config)?);
        Ok(Self::with_transcriber(config, output_dir, transcriber, model))
    }

    pub fn with_transcriber(
        config: &MeetingConfig,
        output_dir: PathBuf,
        transcriber: Arc<dyn Transcriber>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            listening: AtomicBool::new(false),
            session: Mutex::new(None),
            input_device: config.input_device.clone(),
            sample_rate: config.sample_rate.max(8_000),
            transcriber,
            model,
            output_dir,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Transcribe, summarise and save a finished recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAV cannot be written, transcription or
    /// summarisation fails, or the summary file cannot be saved.
    pub async fn process_recording(&self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Ok(
                "I didn't hear anything to transcribe. Please check your audio setup.".to_owned(),
            );
        }
        info!(
            secs = samples.len() as f64 / f64::from(self.sample_rate),
            "processing meeting recording"
        );

        let transcript = transcribe_samples(self.transcriber.as_ref(), samples, self.sample_rate)
            .await?;
        if transcript.trim().is_empty() {
            return Ok("Transcription resulted in an empty text. Nothing to summarize.".to_owned());
        }

        let summary = self.model.complete(&summary_prompt(&transcript)).await?;
        let path = self.save_summary(summary.trim(), transcript.trim())?;
        info!(path = %path.display(), "meeting summary saved");
        Ok(format!(
            "Meeting summary and full transcript have been saved to the file: {}.",
            path.display()
        ))
    }

    fn save_summary(&self, summary: &str, transcript: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let name = format!(
            "Meeting_Summary_{}.txt",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let path = self.output_dir.join(name);
        let banner = "==============================";
        let content = format!(
            "{banner}\n    AI-Generated Summary\n{banner}\n\n{summary}\n\n\n\
             {banner}\n      Full Transcript\n{banner}\n\n{transcript}\n"
        );
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[async_trait]
impl MeetingRecorder for MeetingTranscriber {
    fn start_listening(&self) -> Result<String> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok("I am already listening.".to_owned());
        }
        match audio::capture::start(self.input_device.clone(), self.sample_rate) {
            Ok(session) => {
                *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
                Ok("I am ready to listen. I will start recording when you play audio.".to_owned())
            }
            Err(e) => {
                self.listening.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn stop_listening(&self) -> Result<String> {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return Ok("I wasn't listening.".to_owned());
        }
        let session = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(session) = session else {
            return Ok("I wasn't listening.".to_owned());
        };
        let samples = tokio::task::spawn_blocking(move || session.stop())
            .await
            .map_err(|e| AssistantError::Meeting(format!("capture thread failed: {e}")))?;
        self.process_recording(&samples).await
    }

    fn is_recording(&self) -> bool {
        self.is_listening()
    }
}

fn summary_prompt(transcript: &str) -> String {
    format!(
        "You are an expert meeting summarizer. Analyze the following meeting transcript and \
         provide a concise summary.\n\
         Focus on the key decisions made, the main action items (and who they were assigned to, \
         if mentioned), and any open questions or topics for future discussion.\n\
         Present the summary in a clear, easy-to-read format.\n\n\
         MEETING TRANSCRIPT:\n---\n{}\n---\n\nEXECUTIVE SUMMARY:\n",
        transcript.trim()
    )
}

/// Write `samples` to a temporary WAV and transcribe it.
///
/// # Errors
///
/// Returns an error if the WAV cannot be written or transcription fails.
pub async fn transcribe_samples(
    transcriber: &dyn Transcriber,
    samples: &[f32],
    sample_rate: u32,
) -> Result<String> {
    let wav = tempfile::Builder::new()
        .prefix("kunna-audio-")
        .suffix(".wav")
        .tempfile()?;
    audio::write_wav(wav.path(), samples, sample_rate)?;
    transcriber.transcribe(wav.path()).await
}
