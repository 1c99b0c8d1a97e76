use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaProcessorTrait};
use crate::config::MediaConfig;
use crate::error::{DublineError, Result};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        let command = self.command_builder.extract_audio(video_path, audio_path);
        command
            .execute(self.timeout())
            .await
            .map_err(|e| e.into_stage_error(DublineError::Extraction))?;

        if !audio_path.is_file() {
            return Err(DublineError::Extraction(format!(
                "ffmpeg produced no audio file for {}",
                video_path.display()
            )));
        }

        info!("Audio extraction completed");
        Ok(())
    }

    async fn replace_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Replacing audio of {} with {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        let command = self.command_builder.replace_audio(
            video_path,
            audio_path,
            output_path,
            &self.config.audio_codec,
        );
        command
            .execute(self.timeout())
            .await
            .map_err(|e| e.into_stage_error(DublineError::Media))?;

        info!("Final video created at {}", output_path.display());
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config.subtitle_options,
        );
        command
            .execute(self.timeout())
            .await
            .map_err(|e| e.into_stage_error(DublineError::Media))?;

        info!("Subtitle burn-in completed successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        let output = self
            .command_builder
            .version_check()
            .execute(Duration::from_secs(30))
            .await
            .map_err(|e| DublineError::Media(format!("Media processor not available: {}", e)))?;

        let version_info = String::from_utf8_lossy(&output.stdout);
        // The first line carries the version
        let first_line = version_info.lines().next().unwrap_or("Unknown version").to_string();
        debug!("Media processor: {}", first_line);
        Ok(first_line)
    }
}
