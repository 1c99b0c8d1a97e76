use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::Transcriber;
use crate::config::TranscriberConfig;
use crate::error::{DublineError, Result};
use crate::media::MediaCommand;
use crate::segment::{Segment, Transcript};

/// Whisper CLI JSON output format
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

/// Whisper CLI segment format; only the fields the pipeline uses
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<WhisperOutput> for Transcript {
    fn from(output: WhisperOutput) -> Self {
        let segments = output
            .segments
            .into_iter()
            .map(|seg| Segment::new(seg.start, seg.end, seg.text))
            .collect();
        Transcript::normalized(output.language, segments)
    }
}

/// Runs `whisper <audio> --model <size> --output_format json` in a scratch directory
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn parse_output(json_content: &str) -> Result<Transcript> {
        let output: WhisperOutput = serde_json::from_str(json_content)
            .map_err(|e| DublineError::Transcription(format!("Failed to parse whisper JSON: {}", e)))?;
        Ok(output.into())
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        info!(
            "Transcribing {} with whisper model '{}'",
            audio_path.display(),
            self.config.model
        );

        if !audio_path.is_file() {
            return Err(DublineError::Transcription(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        let temp_dir = tempfile::tempdir().map_err(|e| {
            DublineError::Transcription(format!("Failed to create temp directory: {}", e))
        })?;
        let output_dir = temp_dir.path();

        let mut cmd = MediaCommand::new(&self.config.binary_path, "Whisper transcription")
            .path(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .path(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False");

        if let Some(lang) = &self.config.language {
            cmd = cmd.arg("--language").arg(lang);
        }

        cmd.execute(Duration::from_secs(self.config.timeout_secs))
            .await
            .map_err(|e| e.into_stage_error(DublineError::Transcription))?;

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| DublineError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let json_content = tokio::fs::read_to_string(&json_file).await.map_err(|e| {
            DublineError::Transcription(format!("Failed to read whisper output: {}", e))
        })?;

        let transcript = Self::parse_output(&json_content)?;
        info!(
            "Transcription produced {} segments (language: {})",
            transcript.len(),
            transcript.language.as_deref().unwrap_or("unknown")
        );
        Ok(transcript)
    }
}
