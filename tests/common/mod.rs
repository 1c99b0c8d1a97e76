#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dubline::acquire::MediaAcquirer;
use dubline::error::{DublineError, Result};
use dubline::media::MediaProcessorTrait;
use dubline::notify::Notifier;
use dubline::pipeline::Pipeline;
use dubline::segment::{Segment, Transcript};
use dubline::summarize::{Summarizer, SummaryModel};
use dubline::synthesize::{AudioClip, SpeechBackend, Synthesizer, VoiceProfile};
use dubline::transcribe::Transcriber;
use dubline::translate::SegmentTranslator;
use dubline::workspace::{Artifact, ArtifactKind};

pub const SAMPLE_RATE: u32 = 16_000;
pub const SAMPLES_PER_CHAR: usize = 100;
pub const GAP_SAMPLES: usize = 3_200;

pub struct FakeAcquirer;

#[async_trait]
impl MediaAcquirer for FakeAcquirer {
    async fn acquire(&self, _url: &str, dest: &Path) -> Result<()> {
        tokio::fs::write(dest, b"fake video").await?;
        Ok(())
    }

    async fn acquire_audio(&self, _url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let path = dest_dir.join("audio.wav");
        tokio::fs::write(&path, b"fake audio").await?;
        Ok(path)
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("yt-dlp fake".to_string())
    }
}

/// Writes placeholder outputs; muxing can be switched to fail
#[derive(Default)]
pub struct FakeMedia {
    pub fail_mux: AtomicBool,
}

impl FakeMedia {
    pub fn failing_mux() -> Self {
        Self {
            fail_mux: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for FakeMedia {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        assert!(video_path.exists(), "video must be acquired before extraction");
        tokio::fs::write(audio_path, b"mp3").await?;
        Ok(())
    }

    async fn replace_audio(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        assert!(video_path.exists() && audio_path.exists());
        if self.fail_mux.load(Ordering::SeqCst) {
            return Err(DublineError::Media("ffmpeg exited with status 1".to_string()));
        }
        tokio::fs::write(output_path, b"muxed").await?;
        Ok(())
    }

    async fn burn_subtitles(&self, _video_path: &Path, _subtitle_path: &Path, output_path: &Path) -> Result<()> {
        tokio::fs::write(output_path, b"burned").await?;
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("ffmpeg fake".to_string())
    }
}

pub struct FakeTranscriber {
    pub segments: Vec<Segment>,
}

impl FakeTranscriber {
    pub fn three_segments() -> Self {
        Self {
            segments: vec![
                Segment::new(0.0, 2.0, "hello"),
                Segment::new(2.0, 5.0, "world"),
                Segment::new(5.0, 5.5, "!"),
            ],
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        assert!(audio_path.exists(), "audio must be extracted before transcription");
        Ok(Transcript::normalized(Some("en".to_string()), self.segments.clone()))
    }
}

/// Upper-cases text; fails on `fail_on`
pub struct FakeTranslator {
    pub fail_on: Option<&'static str>,
}

#[async_trait]
impl SegmentTranslator for FakeTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if Some(text) == self.fail_on {
            return Err(DublineError::translation(format!(
                "backend rejected '{}' for {}",
                text, target_language
            )));
        }
        Ok(text.to_uppercase())
    }
}

pub struct FakeSpeech;

#[async_trait]
impl SpeechBackend for FakeSpeech {
    async fn speak(&self, text: &str, _voice: &VoiceProfile) -> Result<AudioClip> {
        Ok(AudioClip::new(
            SAMPLE_RATE,
            vec![0.1; text.chars().count() * SAMPLES_PER_CHAR],
        ))
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("tts fake".to_string())
    }
}

pub struct FakeSummaryModel;

#[async_trait]
impl SummaryModel for FakeSummaryModel {
    async fn summarize(&self, transcript: &str, _max_words: u32) -> Result<String> {
        Ok(format!("summary of: {}", transcript))
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("summary model fake".to_string())
    }
}

/// One recorded delivery: recipient and the attached kinds that existed on disk
pub type Delivery = (String, Vec<ArtifactKind>);

/// Records deliveries instead of sending mail; can be told to refuse them
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, recipient: &str, artifacts: &[Artifact]) -> Result<()> {
        if self.fail {
            return Err(DublineError::Delivery("SMTP send failed: connection refused".to_string()));
        }
        let kinds = artifacts.iter().filter(|a| a.exists()).map(|a| a.kind).collect();
        self.deliveries.lock().unwrap().push((recipient.to_string(), kinds));
        Ok(())
    }
}

pub fn synthesizer() -> Synthesizer {
    Synthesizer::new(Arc::new(FakeSpeech), 1.3, Duration::from_millis(200))
}

/// Length in samples of a clip for `chars` characters after the 1.3x speed-up
pub fn sped_up_len(chars: usize) -> usize {
    ((chars * SAMPLES_PER_CHAR) as f64 / 1.3).round() as usize
}

pub fn pipeline(media: FakeMedia, translator: FakeTranslator) -> Pipeline {
    Pipeline::new(
        Arc::new(FakeAcquirer),
        Arc::new(media),
        Arc::new(FakeTranscriber::three_segments()),
        Arc::new(translator),
        synthesizer(),
    )
    .with_speaker_style("speaks at a fast pace")
}

pub fn summarizer() -> Summarizer {
    Summarizer::new(
        Arc::new(FakeAcquirer),
        Arc::new(FakeTranscriber::three_segments()),
        Arc::new(FakeSummaryModel),
        Arc::new(FakeTranslator { fail_on: None }),
    )
}
