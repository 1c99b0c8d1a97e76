use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::AcquireConfig;
use crate::error::{DublineError, Result};
use crate::media::{CommandError, MediaCommand};

/// Fetches remote media into local storage
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Download the video at `url` to exactly `dest`
    async fn acquire(&self, url: &str, dest: &Path) -> Result<()>;

    /// Download only the audio of `url` as WAV into `dest_dir`, returning its path
    async fn acquire_audio(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;

    async fn check_availability(&self) -> Result<String>;
}

/// yt-dlp stderr fragments for failures that no retry will fix
const PERMANENT_FAILURES: &[&str] = &[
    "unsupported url",
    "private video",
    "video unavailable",
    "is not available",
    "has been removed",
    "sign in to confirm your age",
    "members-only",
    "http error 404",
];

/// Attribute a failed yt-dlp call to `url`, deciding whether a retry may help.
fn acquisition_error(url: &str, error: CommandError) -> DublineError {
    let transient = match &error {
        CommandError::Failed { stderr, .. } => {
            let stderr = stderr.to_lowercase();
            !PERMANENT_FAILURES.iter().any(|marker| stderr.contains(marker))
        }
        CommandError::Killed { .. } | CommandError::TimedOut { .. } => true,
        CommandError::Spawn { .. } => false,
    };
    error.into_stage_error(|message| DublineError::Acquisition {
        url: url.to_string(),
        message,
        transient,
    })
}

/// yt-dlp backed acquirer
pub struct YtDlpAcquirer {
    config: AcquireConfig,
}

impl YtDlpAcquirer {
    pub fn new(config: AcquireConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    pub fn video_command(&self, url: &str, dest: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Video download")
            .arg("--no-playlist")
            .arg("--force-overwrites")
            .arg("-f")
            .arg(&self.config.format)
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("-o")
            .path(dest)
            .arg(url)
    }

    pub fn audio_command(&self, url: &str, dest_dir: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Audio download")
            .arg("--no-playlist")
            .arg("--force-overwrites")
            .arg("-f")
            .arg(&self.config.audio_format)
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("-o")
            .path(dest_dir.join("audio.%(ext)s"))
            .arg(url)
    }
}

/// Rejects anything that is not an absolute http(s) URL before yt-dlp sees it.
pub fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !trimmed.contains(char::is_whitespace) => Ok(()),
        _ => Err(DublineError::Validation(format!(
            "expected an http(s) video URL, got '{}'",
            url
        ))),
    }
}

#[async_trait]
impl MediaAcquirer for YtDlpAcquirer {
    async fn acquire(&self, url: &str, dest: &Path) -> Result<()> {
        validate_url(url)?;
        info!("Downloading video {} -> {}", url, dest.display());

        self.video_command(url, dest)
            .execute(self.timeout())
            .await
            .map_err(|e| acquisition_error(url, e))?;

        if !dest.is_file() {
            return Err(DublineError::Acquisition {
                url: url.to_string(),
                message: format!("download finished but {} is missing", dest.display()),
                transient: false,
            });
        }

        info!("Video downloaded to {}", dest.display());
        Ok(())
    }

    async fn acquire_audio(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        validate_url(url)?;
        info!("Downloading audio of {} into {}", url, dest_dir.display());

        self.audio_command(url, dest_dir)
            .execute(self.timeout())
            .await
            .map_err(|e| acquisition_error(url, e))?;

        let audio_path = dest_dir.join("audio.wav");
        if !audio_path.is_file() {
            return Err(DublineError::Acquisition {
                url: url.to_string(),
                message: format!("audio download finished but {} is missing", audio_path.display()),
                transient: false,
            });
        }
        Ok(audio_path)
    }

    async fn check_availability(&self) -> Result<String> {
        let output = MediaCommand::new(&self.config.binary_path, "Version check")
            .arg("--version")
            .execute(Duration::from_secs(30))
            .await
            .map_err(|e| DublineError::Config(format!("yt-dlp not available: {}", e)))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
