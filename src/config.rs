use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{DublineError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "dubline.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub acquire: AcquireConfig,
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub synthesis: SynthesisConfig,
    pub subtitle: SubtitleConfig,
    pub media: MediaConfig,
    pub retry: RetryConfig,
    pub summarize: SummarizeConfig,
    pub store: StoreConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Jobs waiting beyond this many are rejected with 503
    pub queue_capacity: usize,
    /// Pipelines allowed to run at the same time
    pub max_concurrent_jobs: usize,
    /// Finished jobs stay queryable for this long
    pub job_retention_secs: u64,
    /// Upper bound on finished jobs kept in memory
    pub max_finished_jobs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent directory for per-run working directories
    pub root: PathBuf,
    /// Keep run directories after delivery instead of removing them
    pub keep_artifacts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    /// Path to yt-dlp binary
    pub binary_path: String,
    /// yt-dlp format selector for the video download
    pub format: String,
    /// yt-dlp format selector for audio-only downloads (summaries)
    pub audio_format: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper CLI
    pub binary_path: String,
    /// Model size (tiny, base, small, medium, large)
    pub model: String,
    /// Source language hint; auto-detected when unset
    pub language: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationBackend {
    /// Google Translate web endpoint
    Google,
    /// Local LLM served by ollama
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub backend: TranslationBackend,
    /// Google Translate endpoint URL
    pub google_endpoint: String,
    /// Ollama endpoint URL
    pub ollama_endpoint: String,
    /// LLM model to use when backend = "ollama"
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Base URL of the TTS service exposing `POST /v1/audio/speech`
    pub endpoint: String,
    pub model: String,
    /// Playback speed applied to every synthesized segment
    pub speed: f32,
    /// Silence appended after every segment
    pub gap_ms: u64,
    /// Style text appended to the speaker name for built-in voices
    pub speaker_style: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    pub font_name: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Codec used when re-encoding the dubbed audio track
    pub audio_codec: String,
    /// Render the subtitle file into an additional video
    pub burn_subtitles: bool,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    pub model: String,
    pub max_words: u32,
    /// Summary language when the request names none
    pub default_language: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file holding translation request records
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub relay: String,
    pub port: u16,
    pub username: String,
    /// Prefer DUBLINE_SMTP_PASSWORD over storing this in the file
    pub password: Option<String>,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            queue_capacity: 32,
            max_concurrent_jobs: 1,
            job_retention_secs: 24 * 60 * 60,
            max_finished_jobs: 1000,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".dubline/runs"),
            keep_artifacts: false,
        }
    }
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4".to_string(),
            audio_format: "bestaudio/best".to_string(),
            timeout_secs: 1800,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
            language: None,
            timeout_secs: 3600,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::Google,
            google_endpoint: "https://translate.googleapis.com".to_string(),
            ollama_endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            model: "ai4bharat/indic-parler-tts".to_string(),
            speed: 1.3,
            gap_ms: 200,
            speaker_style: "speaks at an extremely fast pace with a slightly moderate-pitched voice, \
                captured clearly in a close-sounding environment with excellent recording quality"
                .to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 20,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            audio_codec: "aac".to_string(),
            burn_subtitles: false,
            subtitle_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
            timeout_secs: 3600,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
            jitter_ms: 250,
        }
    }
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            max_words: 120,
            default_language: "hi".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".dubline/requests.sqlite"),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            relay: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: None,
            from: String::new(),
            subject: "Your Translated Video and Subtitles".to_string(),
            body: "Hi, your translated video and subtitles are ready. Please find them attached."
                .to_string(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DublineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DublineError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DublineError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DublineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Explicit path, else `./dubline.toml` when present, else defaults.
    /// Secrets from the environment are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("DUBLINE_SMTP_USERNAME") {
            self.mail.username = username;
        }
        if let Some(password) = lookup("DUBLINE_SMTP_PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(from) = lookup("DUBLINE_MAIL_FROM") {
            self.mail.from = from;
        }
    }

    pub fn validate(&self) -> Result<()> {
        // speed_up only shortens clips
        if !(self.synthesis.speed >= 1.0) {
            return Err(DublineError::Config(format!(
                "synthesis.speed must be at least 1.0, got {}",
                self.synthesis.speed
            )));
        }
        if self.server.max_concurrent_jobs == 0 || self.server.queue_capacity == 0 {
            return Err(DublineError::Config(
                "server.max_concurrent_jobs and server.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.mail.enabled && (self.mail.from.is_empty() || self.mail.password.is_none()) {
            return Err(DublineError::Config(
                "mail is enabled but sender or password is missing (set DUBLINE_MAIL_FROM / DUBLINE_SMTP_PASSWORD)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
