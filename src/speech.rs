//! Spoken replies and voice commands.
//!
//! [`Speaker`] turns reply text into audio through an OpenAI-compatible
//! `/v1/audio/speech` server and plays it on a background thread. Only one
//! utterance plays at a time: requests made while speaking are ignored and
//! [`Speaker::stop`] cuts the current one short.
//!
//! [`VoiceInput`] records one spoken command from the microphone. It
//! calibrates against room noise, waits for speech to start, stops after a
//! short silence (or at the phrase limit) and transcribes the recording
//! with the meeting [`Transcriber`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::audio::{self, Pcm, playback::AudioSink};
use crate::config::{MeetingConfig, VoiceConfig};
use crate::error::{AssistantError, Result};
use crate::handlers::meeting::{Transcriber, transcribe_samples};

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);
const PLAYBACK_POLL: Duration = Duration::from_millis(50);
const LISTEN_POLL: Duration = Duration::from_millis(100);

/// Text-to-speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Pcm>;
}

/// JSON POST to `{base}/v1/audio/speech` asking for a WAV response
/// (OpenAI, Kokoro-FastAPI, openedai-speech).
#[derive(Debug)]
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    voice: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

impl HttpSynthesizer {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Speech(format!("failed to build HTTP client: {e}")))?;
        let url = config.tts_url.trim().trim_end_matches('/');
        Ok(Self {
            client,
            base_url: url.strip_suffix("/v1").unwrap_or(url).to_owned(),
            model: config.tts_model.clone(),
            voice: config.voice.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Pcm> {
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
        };
        let mut request = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AssistantError::Speech(format!("speech request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Speech(format!(
                "speech server returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssistantError::Speech(format!("cannot read speech response: {e}")))?;
        let pcm = audio::decode_wav(&bytes)?;
        debug!(secs = pcm.duration_secs(), "speech synthesized");
        Ok(pcm)
    }
}

/// Plays spoken replies, one at a time.
pub struct Speaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    /// Keep-playing flag of the utterance in progress.
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl Speaker {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            synthesizer,
            sink,
            current: Mutex::new(None),
        }
    }

    /// Whether an utterance is playing.
    pub fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Synthesize `text` and start playing it in the background.
    ///
    /// Returns `Ok(false)` without doing anything when `text` is blank or
    /// another utterance is still playing.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails or the playback thread cannot
    /// be spawned.
    pub async fn speak(&self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        if self.is_speaking() {
            debug!("already speaking, ignoring new utterance");
            return Ok(false);
        }
        let pcm = self.synthesizer.synthesize(text).await?;

        let flag = Arc::new(AtomicBool::new(true));
        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if current
                .as_ref()
                .is_some_and(|playing| playing.load(Ordering::SeqCst))
            {
                return Ok(false);
            }
            *current = Some(Arc::clone(&flag));
        }

        let sink = Arc::clone(&self.sink);
        let playing = Arc::clone(&flag);
        let spawned = std::thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || {
                if let Err(e) = sink.play(&pcm, &playing) {
                    error!("speech playback failed: {e}");
                }
                playing.store(false, Ordering::SeqCst);
            });
        if let Err(e) = spawned {
            flag.store(false, Ordering::SeqCst);
            return Err(AssistantError::Audio(format!(
                "cannot spawn playback thread: {e}"
            )));
        }
        Ok(true)
    }

    /// Speak `text` and wait until playback ends or is stopped.
    ///
    /// # Errors
    ///
    /// Same as [`Speaker::speak`].
    pub async fn speak_and_wait(&self, text: &str) -> Result<()> {
        if self.speak(text).await? {
            while self.is_speaking() {
                tokio::time::sleep(PLAYBACK_POLL).await;
            }
        }
        Ok(())
    }

    /// Cut the current utterance short. Returns whether anything was
    /// playing.
    pub fn stop(&self) -> bool {
        let flag = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let stopped = flag.is_some_and(|flag| flag.swap(false, Ordering::SeqCst));
        if stopped {
            info!("speech stopped");
        }
        stopped
    }
}

/// Timing for one spoken command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseTiming {
    /// Leading room noise used to set the speech threshold.
    pub calibration: Duration,
    /// How long to wait for speech to start.
    pub start_timeout: Duration,
    /// Longest phrase recorded.
    pub phrase_limit: Duration,
    /// Silence that ends a phrase.
    pub trailing_silence: Duration,
}

impl Default for PhraseTiming {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            start_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            trailing_silence: Duration::from_millis(800),
        }
    }
}

impl PhraseTiming {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            start_timeout: Duration::from_secs(config.listen_timeout_secs),
            phrase_limit: Duration::from_secs(config.phrase_limit_secs),
            ..Self::default()
        }
    }
}

/// Where a [`PhraseDetector`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listening {
    /// Still calibrating, waiting for speech or inside a phrase.
    Waiting,
    /// A phrase was spoken and has ended.
    Heard,
    /// Nobody spoke before the start timeout.
    Silence,
}

const FRAME: Duration = Duration::from_millis(50);
const NOISE_FACTOR: f32 = 3.0;
const MIN_THRESHOLD: f32 = 0.01;

/// Energy-based end-of-phrase detection over 50 ms frames.
#[derive(Debug)]
pub struct PhraseDetector {
    frame_len: usize,
    pending: Vec<f32>,
    frames: usize,
    calibration_frames: usize,
    start_timeout_frames: usize,
    phrase_limit_frames: usize,
    trailing_frames: usize,
    noise_sum: f32,
    threshold: f32,
    started: bool,
    phrase_frames: usize,
    quiet_run: usize,
    outcome: Option<Listening>,
}

fn frames_in(d: Duration) -> usize {
    (d.as_millis() / FRAME.as_millis()).max(1) as usize
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

impl PhraseDetector {
    pub fn new(sample_rate: u32, timing: PhraseTiming) -> Self {
        let frame_len = (u128::from(sample_rate) * FRAME.as_millis() / 1000).max(1) as usize;
        Self {
            frame_len,
            pending: Vec::new(),
            frames: 0,
            calibration_frames: frames_in(timing.calibration),
            start_timeout_frames: frames_in(timing.start_timeout),
            phrase_limit_frames: frames_in(timing.phrase_limit),
            trailing_frames: frames_in(timing.trailing_silence),
            noise_sum: 0.0,
            threshold: MIN_THRESHOLD,
            started: false,
            phrase_frames: 0,
            quiet_run: 0,
            outcome: None,
        }
    }

    /// Feed newly captured samples.
    pub fn push(&mut self, samples: &[f32]) -> Listening {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        self.pending.extend_from_slice(samples);
        let mut offset = 0;
        while self.pending.len() - offset >= self.frame_len {
            let level = rms(&self.pending[offset..offset + self.frame_len]);
            offset += self.frame_len;
            let state = self.frame(level);
            if state != Listening::Waiting {
                self.outcome = Some(state);
                break;
            }
        }
        self.pending.drain(..offset);
        self.outcome.unwrap_or(Listening::Waiting)
    }

    fn frame(&mut self, level: f32) -> Listening {
        self.frames += 1;
        if self.frames <= self.calibration_frames {
            self.noise_sum += level;
            if self.frames == self.calibration_frames {
                let floor = self.noise_sum / self.calibration_frames as f32;
                self.threshold = (floor * NOISE_FACTOR).max(MIN_THRESHOLD);
                debug!(threshold = self.threshold, "voice threshold calibrated");
            }
            return Listening::Waiting;
        }

        let loud = level > self.threshold;
        if !self.started {
            if loud {
                self.started = true;
                self.phrase_frames = 1;
            } else if self.frames - self.calibration_frames >= self.start_timeout_frames {
                return Listening::Silence;
            }
            return Listening::Waiting;
        }

        self.phrase_frames += 1;
        self.quiet_run = if loud { 0 } else { self.quiet_run + 1 };
        if self.quiet_run >= self.trailing_frames || self.phrase_frames >= self.phrase_limit_frames
        {
            Listening::Heard
        } else {
            Listening::Waiting
        }
    }
}

/// One-shot spoken command recognition from the microphone.
pub struct VoiceInput {
    transcriber: Arc<dyn Transcriber>,
    input_device: Option<String>,
    sample_rate: u32,
    timing: PhraseTiming,
}

impl std::fmt::Debug for VoiceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceInput")
            .field("input_device", &self.input_device)
            .field("sample_rate", &self.sample_rate)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl VoiceInput {
    /// Voice input on the meeting input device and transcription server.
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        meeting: &MeetingConfig,
        voice: &VoiceConfig,
    ) -> Self {
        Self {
            transcriber,
            input_device: meeting.input_device.clone(),
            sample_rate: meeting.sample_rate,
            timing: PhraseTiming::from_config(voice),
        }
    }

    /// Record one phrase and return it lowercased, or `None` if nobody
    /// spoke or nothing intelligible was heard.
    ///
    /// # Errors
    ///
    /// Returns an error if the input device cannot be opened or
    /// transcription fails.
    pub async fn listen(&self) -> Result<Option<String>> {
        let device = self.input_device.clone();
        let rate = self.sample_rate;
        let session = tokio::task::spawn_blocking(move || audio::capture::start(device, rate))
            .await
            .map_err(|e| AssistantError::Audio(format!("capture task failed: {e}")))??;
        info!("listening for a command");

        let mut detector = PhraseDetector::new(rate, self.timing);
        let mut seen = 0;
        let outcome = loop {
            tokio::time::sleep(LISTEN_POLL).await;
            let fresh = session.samples_from(seen);
            seen += fresh.len();
            match detector.push(&fresh) {
                Listening::Waiting => continue,
                done => break done,
            }
        };
        let samples = tokio::task::spawn_blocking(move || session.stop())
            .await
            .map_err(|e| AssistantError::Audio(format!("capture task failed: {e}")))?;

        if outcome == Listening::Silence {
            info!("no speech before the listen timeout");
            return Ok(None);
        }
        let text = transcribe_samples(self.transcriber.as_ref(), &samples, rate).await?;
        let text = text.trim().to_lowercase();
        debug!(%text, "voice command transcribed");
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct ToneSynth {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for ToneSynth {
        async fn synthesize(&self, _text: &str) -> Result<Pcm> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Pcm {
                samples: vec![0.1; 160],
                sample_rate: 16_000,
            })
        }
    }

    /// Plays until released or stopped.
    #[derive(Default)]
    struct HeldSink {
        started: AtomicUsize,
        release: AtomicBool,
        interrupted: AtomicBool,
    }

    impl AudioSink for HeldSink {
        fn play(&self, _pcm: &Pcm, keep_playing: &AtomicBool) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            loop {
                if !keep_playing.load(Ordering::SeqCst) {
                    self.interrupted.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                if self.release.load(Ordering::SeqCst) {
                    return Ok(());
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    fn speaker(synth: &Arc<ToneSynth>, sink: &Arc<HeldSink>) -> Speaker {
        Speaker::new(
            Arc::clone(synth) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(sink) as Arc<dyn AudioSink>,
        )
    }

    #[tokio::test]
    async fn stop_cuts_playback_short() {
        let synth = Arc::new(ToneSynth::default());
        let sink = Arc::new(HeldSink::default());
        let speaker = speaker(&synth, &sink);

        assert!(speaker.speak("hello there").await.unwrap());
        wait_until(|| sink.started.load(Ordering::SeqCst) == 1).await;
        assert!(speaker.is_speaking());

        assert!(speaker.stop());
        wait_until(|| sink.interrupted.load(Ordering::SeqCst)).await;
        assert!(!speaker.is_speaking());
        assert!(!speaker.stop());
    }

    #[tokio::test]
    async fn requests_while_speaking_are_ignored() {
        let synth = Arc::new(ToneSynth::default());
        let sink = Arc::new(HeldSink::default());
        let speaker = speaker(&synth, &sink);

        assert!(speaker.speak("first").await.unwrap());
        assert!(!speaker.speak("second").await.unwrap());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);

        sink.release.store(true, Ordering::SeqCst);
        wait_until(|| !speaker.is_speaking()).await;
        assert!(!sink.interrupted.load(Ordering::SeqCst));

        assert!(speaker.speak("third").await.unwrap());
        wait_until(|| !speaker.is_speaking()).await;
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn blank_text_is_not_spoken() {
        let synth = Arc::new(ToneSynth::default());
        let sink = Arc::new(HeldSink::default());
        let speaker = speaker(&synth, &sink);

        assert!(!speaker.speak("  \n").await.unwrap());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
        assert!(!speaker.is_speaking());
        assert!(!speaker.stop());
    }

    #[tokio::test]
    async fn speak_and_wait_returns_after_playback() {
        let synth = Arc::new(ToneSynth::default());
        let sink = Arc::new(HeldSink::default());
        sink.release.store(true, Ordering::SeqCst);
        let speaker = speaker(&synth, &sink);

        speaker.speak_and_wait("goodbye").await.unwrap();
        assert_eq!(sink.started.load(Ordering::SeqCst), 1);
        assert!(!speaker.is_speaking());
    }

    const RATE: u32 = 16_000;

    fn level(value: f32, secs: f32) -> Vec<f32> {
        vec![value; (RATE as f32 * secs) as usize]
    }

    fn feed(detector: &mut PhraseDetector, samples: &[f32]) -> Listening {
        let mut state = Listening::Waiting;
        for chunk in samples.chunks(1_600) {
            state = detector.push(chunk);
        }
        state
    }

    #[test]
    fn phrase_ends_after_trailing_silence() {
        let mut detector = PhraseDetector::new(RATE, PhraseTiming::default());
        assert_eq!(feed(&mut detector, &level(0.0, 1.0)), Listening::Waiting);
        assert_eq!(feed(&mut detector, &level(0.3, 2.0)), Listening::Waiting);
        assert_eq!(feed(&mut detector, &level(0.0, 0.5)), Listening::Waiting);
        assert_eq!(feed(&mut detector, &level(0.0, 0.5)), Listening::Heard);
        assert_eq!(detector.push(&level(0.3, 1.0)), Listening::Heard);
    }

    #[test]
    fn nobody_speaking_times_out() {
        let mut detector = PhraseDetector::new(RATE, PhraseTiming::default());
        assert_eq!(feed(&mut detector, &level(0.0, 5.5)), Listening::Waiting);
        assert_eq!(feed(&mut detector, &level(0.0, 1.0)), Listening::Silence);
    }

    #[test]
    fn long_phrases_are_cut_at_the_limit() {
        let mut detector = PhraseDetector::new(RATE, PhraseTiming::default());
        feed(&mut detector, &level(0.0, 1.0));
        assert_eq!(feed(&mut detector, &level(0.3, 9.5)), Listening::Waiting);
        assert_eq!(feed(&mut detector, &level(0.3, 1.0)), Listening::Heard);
    }

    #[test]
    fn threshold_follows_room_noise() {
        let mut detector = PhraseDetector::new(RATE, PhraseTiming::default());
        feed(&mut detector, &level(0.05, 1.0));
        // 0.1 is below three times the noise floor.
        assert_eq!(feed(&mut detector, &level(0.1, 6.0)), Listening::Silence);
    }

    #[test]
    fn timing_comes_from_config() {
        let config = VoiceConfig {
            listen_timeout_secs: 3,
            phrase_limit_secs: 7,
            ..VoiceConfig::default()
        };
        let timing = PhraseTiming::from_config(&config);
        assert_eq!(timing.start_timeout, Duration::from_secs(3));
        assert_eq!(timing.phrase_limit, Duration::from_secs(7));
        assert_eq!(timing.calibration, Duration::from_secs(1));
    }
}
