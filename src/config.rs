//! Configuration types for the assistant.
//!
//! Loaded from TOML; every section falls back to defaults for missing
//! fields. API secrets may also come from the environment (see
//! [`AssistantConfig::apply_env_overrides`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AssistantError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Language model used for routing, chat and summaries.
    pub llm: LlmConfig,
    /// Web search settings.
    pub search: SearchSettings,
    /// Google Calendar settings.
    pub calendar: CalendarConfig,
    /// Stock quotes and price alerts.
    pub finance: FinanceConfig,
    /// Key/value memory store.
    pub memory: MemoryConfig,
    /// Health metric log.
    pub health: HealthConfig,
    /// Meeting recording and transcription.
    pub meeting: MeetingConfig,
    /// File summaries and the file finder.
    pub files: FilesConfig,
    /// Application launcher.
    pub apps: AppsConfig,
    /// Spoken replies and voice input.
    pub voice: VoiceConfig,
}

/// Which hosted model API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini `generateContent`.
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions server (OpenAI, Ollama, vLLM).
    OpenAi,
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider API flavour.
    pub provider: LlmProvider,
    /// Base URL. Empty selects the provider's public endpoint.
    pub api_url: String,
    /// Model name.
    pub model: String,
    /// API key. Usually supplied through the environment instead.
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate per request.
    pub max_tokens: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_url: String::new(),
            model: "gemini-1.5-flash".to_owned(),
            api_key: String::new(),
            temperature: 0.4,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Base URL with the provider default applied and trailing slashes removed.
    pub fn effective_api_url(&self) -> String {
        let url = if self.api_url.trim().is_empty() {
            match self.provider {
                LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
                LlmProvider::OpenAi => "https://api.openai.com",
            }
        } else {
            self.api_url.trim()
        };
        url.trim_end_matches('/').to_owned()
    }
}

/// Web search configuration (Serper).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Serper API key.
    pub api_key: String,
    /// Search endpoint.
    pub endpoint: String,
    /// Number of results handed to the summariser.
    pub max_results: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Result cache TTL in seconds (0 disables caching).
    pub cache_ttl_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let defaults = kunna_search::SearchConfig::default();
        Self {
            api_key: String::new(),
            endpoint: defaults.endpoint,
            max_results: defaults.max_results,
            timeout_secs: defaults.timeout_seconds,
            cache_ttl_secs: defaults.cache_ttl_seconds,
        }
    }
}

impl SearchSettings {
    /// Convert into the search crate's configuration.
    pub fn to_search_config(&self) -> kunna_search::SearchConfig {
        kunna_search::SearchConfig {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            max_results: self.max_results,
            timeout_seconds: self.timeout_secs,
            cache_ttl_seconds: self.cache_ttl_secs,
        }
    }
}

/// Google Calendar configuration.
///
/// The access token is obtained out of band (OAuth consent flow); this
/// crate only presents it as a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// OAuth access token with the calendar scope.
    pub access_token: String,
    /// Calendar v3 API base URL.
    pub api_base: String,
    /// Calendar identifier.
    pub calendar_id: String,
    /// Duration of newly created events, in minutes.
    pub event_duration_minutes: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base: "https://www.googleapis.com/calendar/v3".to_owned(),
            calendar_id: "primary".to_owned(),
            event_duration_minutes: 60,
        }
    }
}

/// Market data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceConfig {
    /// Yahoo Finance API base URL.
    pub api_base: String,
    /// Seconds between price alert checks.
    pub alert_check_interval_secs: u64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://query1.finance.yahoo.com".to_owned(),
            alert_check_interval_secs: 300,
        }
    }
}

/// Key/value memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Persist remembered facts between sessions.
    pub persist: bool,
    /// Override for the memory file (defaults to `<data_dir>/memory.json`).
    pub path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
        }
    }
}

/// Health log configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Override for the log file (defaults to `<data_dir>/health_log.jsonl`).
    pub log_path: Option<PathBuf>,
}

/// Meeting recording and transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    /// Base URL of an OpenAI-compatible transcription server.
    pub transcription_url: String,
    /// Transcription model name.
    pub transcription_model: String,
    /// API key for the transcription server (empty for local servers).
    pub api_key: String,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Input device name (None = system default).
    pub input_device: Option<String>,
    /// Where summaries are written (defaults to `<data_dir>/meetings`).
    pub output_dir: Option<PathBuf>,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            transcription_url: "http://localhost:8080".to_owned(),
            transcription_model: "whisper-1".to_owned(),
            api_key: String::new(),
            sample_rate: 16_000,
            input_device: None,
            output_dir: None,
        }
    }
}

/// Spoken replies (text-to-speech) and voice input.
///
/// Voice input reuses the `[meeting]` transcription server and input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Speak replies in text chat as well (voice mode always speaks).
    pub speak_replies: bool,
    /// Base URL of an OpenAI-compatible speech server (`/v1/audio/speech`).
    pub tts_url: String,
    /// Speech model name.
    pub tts_model: String,
    /// Voice name.
    pub voice: String,
    /// API key for the speech server (empty for local servers).
    pub api_key: String,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
    /// Seconds to wait for speech to start before giving up.
    pub listen_timeout_secs: u64,
    /// Longest spoken command, in seconds.
    pub phrase_limit_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speak_replies: false,
            tts_url: "http://localhost:8880".to_owned(),
            tts_model: "tts-1".to_owned(),
            voice: "alloy".to_owned(),
            api_key: String::new(),
            output_device: None,
            listen_timeout_secs: 5,
            phrase_limit_secs: 10,
        }
    }
}

/// File summary and finder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Characters of document text sent to the summariser.
    pub max_summary_chars: usize,
    /// Default root for the file finder (defaults to the home directory).
    pub search_root: Option<PathBuf>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: 8000,
            search_root: None,
        }
    }
}

/// Application launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Spoken application name (lower-case) → executable name or path.
    pub applications: BTreeMap<String, String>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        let pairs: &[(&str, &str)] = if cfg!(target_os = "windows") {
            &[
                ("notepad", "notepad.exe"),
                ("calculator", "calc.exe"),
                ("chrome", r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
                ("firefox", r"C:\Program Files\Mozilla Firefox\firefox.exe"),
                ("edge", r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe"),
            ]
        } else if cfg!(target_os = "macos") {
            &[
                ("calculator", "Calculator"),
                ("chrome", "Google Chrome"),
                ("firefox", "Firefox"),
                ("safari", "Safari"),
                ("vscode", "Visual Studio Code"),
                ("visual studio code", "Visual Studio Code"),
            ]
        } else {
            &[
                ("calculator", "gnome-calculator"),
                ("chrome", "google-chrome"),
                ("firefox", "firefox"),
                ("terminal", "x-terminal-emulator"),
                ("vscode", "code"),
                ("visual studio code", "code"),
            ]
        };
        Self {
            applications: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AssistantError::Config(e.to_string()))
    }

    /// Load from `path` if given, else from the default config file when it
    /// exists, else defaults. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = crate::paths::config_file();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistantError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill empty secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Fill empty secrets from `lookup`. Non-empty file values win.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `KUNNA_LLM_API_KEY`, then `GOOGLE_API_KEY` (Gemini) or `OPENAI_API_KEY` | `llm.api_key` |
    /// | `SERPER_API_KEY` | `search.api_key` |
    /// | `GOOGLE_CALENDAR_TOKEN` | `calendar.access_token` |
    /// | `KUNNA_TRANSCRIPTION_API_KEY` | `meeting.api_key` |
    /// | `KUNNA_TTS_API_KEY` | `voice.api_key` |
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.is_empty() {
            let provider_var = match self.llm.provider {
                LlmProvider::Gemini => "GOOGLE_API_KEY",
                LlmProvider::OpenAi => "OPENAI_API_KEY",
            };
            if let Some(key) = non_empty("KUNNA_LLM_API_KEY").or_else(|| non_empty(provider_var)) {
                self.llm.api_key = key;
            }
        }
        if self.search.api_key.is_empty()
            && let Some(key) = non_empty("SERPER_API_KEY")
        {
            self.search.api_key = key;
        }
        if self.calendar.access_token.is_empty()
            && let Some(token) = non_empty("GOOGLE_CALENDAR_TOKEN")
        {
            self.calendar.access_token = token;
        }
        if self.meeting.api_key.is_empty()
            && let Some(key) = non_empty("KUNNA_TRANSCRIPTION_API_KEY")
        {
            self.meeting.api_key = key;
        }
        if self.voice.api_key.is_empty()
            && let Some(key) = non_empty("KUNNA_TTS_API_KEY")
        {
            self.voice.api_key = key;
        }
    }

    /// Resolved memory file path.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .path
            .clone()
            .unwrap_or_else(crate::paths::memory_file)
    }

    /// Resolved health log path.
    pub fn health_log_path(&self) -> PathBuf {
        self.health
            .log_path
            .clone()
            .unwrap_or_else(crate::paths::health_log_file)
    }

    /// Resolved meeting output directory.
    pub fn meetings_dir(&self) -> PathBuf {
        self.meeting
            .output_dir
            .clone()
            .unwrap_or_else(crate::paths::meetings_dir)
    }

    /// Resolved file finder root.
    pub fn search_root(&self) -> PathBuf {
        self.files
            .search_root
            .clone()
            .unwrap_or_else(crate::paths::default_search_root)
    }
}
