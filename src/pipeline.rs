use async_trait::async_trait;
use indicatif::ProgressBar;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::acquire::{validate_url, MediaAcquirer, YtDlpAcquirer};
use crate::config::{Config, SubtitleConfig};
use crate::error::{DublineError, Result};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::retry::RetryPolicy;
use crate::segment::Segment;
use crate::subtitle::write_ass;
use crate::synthesize::{Synthesizer, VoiceProfile};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{translate_segments, SegmentTranslator, TranslatorFactory};
use crate::workspace::{Artifact, ArtifactKind, RunWorkspace};

/// Stages a run passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Acquiring,
    ExtractingAudio,
    Transcribing,
    Translating,
    Synthesizing,
    GeneratingSubtitles,
    Muxing,
    Summarizing,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquiring => "ACQUIRING",
            Stage::ExtractingAudio => "EXTRACTING_AUDIO",
            Stage::Transcribing => "TRANSCRIBING",
            Stage::Translating => "TRANSLATING",
            Stage::Synthesizing => "SYNTHESIZING",
            Stage::GeneratingSubtitles => "GENERATING_SUBTITLES",
            Stage::Muxing => "MUXING",
            Stage::Summarizing => "SUMMARIZING",
            Stage::Done => "DONE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer notified as a run moves between stages
#[async_trait]
pub trait StageListener: Send + Sync {
    async fn on_stage(&self, stage: Stage);

    /// Progress bar for per-segment work, if the caller wants one
    fn segment_progress(&self, _total: usize) -> Option<ProgressBar> {
        None
    }
}

pub struct NoopListener;

#[async_trait]
impl StageListener for NoopListener {
    async fn on_stage(&self, _stage: Stage) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DubRequest {
    pub url: String,
    pub language: String,
    pub voice: String,
}

#[derive(Debug, Clone)]
pub struct DubOutcome {
    pub run_id: Uuid,
    pub language: String,
    pub segments: Vec<Segment>,
    /// Artifacts that exist on disk at the end of the run
    pub artifacts: Vec<Artifact>,
    /// Non-fatal failures (mux, burn-in)
    pub warnings: Vec<String>,
    pub track_duration: Duration,
}

impl DubOutcome {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// Artifacts sent to the requester: every produced video plus the subtitles
    pub fn deliverables(&self) -> Vec<Artifact> {
        [
            ArtifactKind::FinalVideo,
            ArtifactKind::SubtitledVideo,
            ArtifactKind::Subtitles,
        ]
        .into_iter()
        .filter_map(|kind| self.artifact(kind).cloned())
        .collect()
    }
}

/// Sequences acquisition, extraction, transcription, translation, synthesis,
/// subtitle generation and muxing for one request.
pub struct Pipeline {
    acquirer: Arc<dyn MediaAcquirer>,
    media: Arc<dyn MediaProcessorTrait>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn SegmentTranslator>,
    synthesizer: Synthesizer,
    subtitle: SubtitleConfig,
    retry: RetryPolicy,
    burn_subtitles: bool,
    speaker_style: String,
}

impl Pipeline {
    pub fn new(
        acquirer: Arc<dyn MediaAcquirer>,
        media: Arc<dyn MediaProcessorTrait>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn SegmentTranslator>,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            acquirer,
            media,
            transcriber,
            translator,
            synthesizer,
            subtitle: SubtitleConfig::default(),
            retry: RetryPolicy::none(),
            burn_subtitles: false,
            speaker_style: String::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let translator: Arc<dyn SegmentTranslator> =
            Arc::from(TranslatorFactory::create_translator(&config.translate)?);
        let pipeline = Self::new(
            Arc::new(YtDlpAcquirer::new(config.acquire.clone())),
            Arc::from(MediaProcessorFactory::create_processor(config.media.clone())),
            Arc::from(TranscriberFactory::create_default(config.transcriber.clone())),
            translator,
            Synthesizer::from_config(&config.synthesis)?,
        )
        .with_retry(RetryPolicy::new(&config.retry))
        .with_subtitle_config(config.subtitle.clone())
        .with_burn_subtitles(config.media.burn_subtitles)
        .with_speaker_style(&config.synthesis.speaker_style);
        Ok(pipeline)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_subtitle_config(mut self, subtitle: SubtitleConfig) -> Self {
        self.subtitle = subtitle;
        self
    }

    pub fn with_burn_subtitles(mut self, burn: bool) -> Self {
        self.burn_subtitles = burn;
        self
    }

    pub fn with_speaker_style(mut self, style: &str) -> Self {
        self.speaker_style = style.to_string();
        self
    }

    /// Check external tools; returns their version lines.
    pub async fn check_dependencies(&self) -> Result<Vec<String>> {
        let ffmpeg = self.media.check_availability().await?;
        let ytdlp = self.acquirer.check_availability().await?;
        let tts = self.synthesizer.backend().check_availability().await?;
        Ok(vec![ffmpeg, ytdlp, tts])
    }

    /// Reject malformed requests before any work starts.
    pub fn resolve_voice(&self, request: &DubRequest) -> Result<VoiceProfile> {
        validate_url(&request.url)?;
        VoiceProfile::resolve(&request.language, &request.voice, &self.speaker_style)
    }

    pub async fn run(
        &self,
        request: &DubRequest,
        workspace: &RunWorkspace,
        listener: &dyn StageListener,
    ) -> Result<DubOutcome> {
        let voice = self.resolve_voice(request)?;
        info!(
            "Starting dub run {} for {} (language: {}, voice: {})",
            workspace.run_id(),
            request.url,
            voice.language,
            voice.description
        );

        // Step 1: Download the source video
        listener.on_stage(Stage::Acquiring).await;
        let video = workspace.artifact(ArtifactKind::SourceVideo);
        self.retry
            .run("acquisition", |_| self.acquirer.acquire(request.url.trim(), &video.path))
            .await?;

        // Step 2: Extract audio into scratch storage
        listener.on_stage(Stage::ExtractingAudio).await;
        let scratch = workspace.scratch()?;
        let audio_path = scratch.path().join(ArtifactKind::ExtractedAudio.file_name());
        self.media.extract_audio(&video.path, &audio_path).await?;

        // Step 3: Transcribe
        listener.on_stage(Stage::Transcribing).await;
        let transcript = self.transcriber.transcribe(&audio_path).await?;
        drop(scratch);
        if transcript.is_empty() {
            return Err(DublineError::Transcription("no speech detected in source audio".to_string()));
        }
        info!(
            "Transcribed {} segments ({:.2}s of speech)",
            transcript.len(),
            transcript.speech_end()
        );

        // Step 4: Translate segment by segment
        listener.on_stage(Stage::Translating).await;
        let segments =
            translate_segments(self.translator.as_ref(), &transcript, &voice.language, &self.retry).await?;

        // Step 5: Synthesize the dubbed track
        listener.on_stage(Stage::Synthesizing).await;
        let progress = listener.segment_progress(segments.len());
        let track = self
            .synthesizer
            .synthesize(&segments, &voice, progress.as_ref())
            .await;
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }
        let track = track?;
        let dubbed = workspace.artifact(ArtifactKind::DubbedAudio);
        track.write_wav(&dubbed.path).await?;

        // Step 6: Subtitles
        listener.on_stage(Stage::GeneratingSubtitles).await;
        let subtitles = workspace.artifact(ArtifactKind::Subtitles);
        write_ass(&segments, &self.subtitle, &subtitles.path).await?;

        // Step 7: Mux; failures here are reported but do not fail the run
        listener.on_stage(Stage::Muxing).await;
        let mut warnings = Vec::new();
        let final_video = workspace.artifact(ArtifactKind::FinalVideo);
        if let Err(e) = self
            .media
            .replace_audio(&video.path, &dubbed.path, &final_video.path)
            .await
        {
            warn!("Muxing failed, continuing without final video: {}", e);
            warnings.push(e.to_string());
        } else if self.burn_subtitles {
            let subtitled = workspace.artifact(ArtifactKind::SubtitledVideo);
            if let Err(e) = self
                .media
                .burn_subtitles(&final_video.path, &subtitles.path, &subtitled.path)
                .await
            {
                warn!("Subtitle burn-in failed: {}", e);
                warnings.push(e.to_string());
            }
        }

        listener.on_stage(Stage::Done).await;

        let artifacts = [
            ArtifactKind::FinalVideo,
            ArtifactKind::SubtitledVideo,
            ArtifactKind::Subtitles,
            ArtifactKind::DubbedAudio,
        ]
        .into_iter()
        .map(|kind| workspace.artifact(kind))
        .filter(Artifact::exists)
        .collect();

        info!("Dub run {} finished with {} warnings", workspace.run_id(), warnings.len());

        Ok(DubOutcome {
            run_id: workspace.run_id(),
            language: voice.language,
            segments,
            artifacts,
            warnings,
            track_duration: track.duration(),
        })
    }
}
