use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::acquire::{validate_url, MediaAcquirer, YtDlpAcquirer};
use crate::config::Config;
use crate::error::{DublineError, Result};
use crate::ollama::{clean_response, OllamaClient};
use crate::pipeline::{Stage, StageListener};
use crate::retry::RetryPolicy;
use crate::synthesize::normalize_language;
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{SegmentTranslator, TranslatorFactory};
use crate::workspace::RunWorkspace;

/// Produces a translated summary of a video's speech
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, transcript: &str, max_words: u32) -> Result<String>;

    async fn check_availability(&self) -> Result<String>;
}

pub struct OllamaSummaryModel {
    client: OllamaClient,
}

impl OllamaSummaryModel {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn build_prompt(transcript: &str, max_words: u32) -> String {
        format!(
            "Summarize the following video transcript in English in at most {} words.\n\
             Keep the key points, skip filler, and output only the summary.\n\
             \n\
             [Transcript]\n\
             {}",
            max_words, transcript
        )
    }
}

#[async_trait]
impl SummaryModel for OllamaSummaryModel {
    async fn summarize(&self, transcript: &str, max_words: u32) -> Result<String> {
        let raw = self
            .client
            .generate(Self::build_prompt(transcript, max_words), false)
            .await
            .map_err(|f| DublineError::Summarization(f.message))?;
        Ok(clean_response(&raw))
    }

    async fn check_availability(&self) -> Result<String> {
        self.client.check_availability().await?;
        Ok(format!("ollama model {}", self.client.model()))
    }
}

/// Audio-only pipeline: download, transcribe, summarize, translate
pub struct Summarizer {
    acquirer: Arc<dyn MediaAcquirer>,
    transcriber: Arc<dyn Transcriber>,
    model: Arc<dyn SummaryModel>,
    translator: Arc<dyn SegmentTranslator>,
    retry: RetryPolicy,
    max_words: u32,
    default_language: String,
}

impl Summarizer {
    pub fn new(
        acquirer: Arc<dyn MediaAcquirer>,
        transcriber: Arc<dyn Transcriber>,
        model: Arc<dyn SummaryModel>,
        translator: Arc<dyn SegmentTranslator>,
    ) -> Self {
        Self {
            acquirer,
            transcriber,
            model,
            translator,
            retry: RetryPolicy::none(),
            max_words: 120,
            default_language: "hi".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(
            &config.summarize.endpoint,
            &config.summarize.model,
            Duration::from_secs(config.summarize.timeout_secs),
        )?;
        let mut summarizer = Self::new(
            Arc::new(YtDlpAcquirer::new(config.acquire.clone())),
            Arc::from(TranscriberFactory::create_default(config.transcriber.clone())),
            Arc::new(OllamaSummaryModel::new(client)),
            Arc::from(TranslatorFactory::create_translator(&config.translate)?),
        );
        summarizer.retry = RetryPolicy::new(&config.retry);
        summarizer.max_words = config.summarize.max_words;
        summarizer.default_language = config.summarize.default_language.clone();
        Ok(summarizer)
    }

    /// Check the downloader and the summary model; returns their descriptions.
    pub async fn check_dependencies(&self) -> Result<Vec<String>> {
        let ytdlp = self.acquirer.check_availability().await?;
        let model = self.model.check_availability().await?;
        Ok(vec![ytdlp, model])
    }

    pub async fn summarize(
        &self,
        url: &str,
        language: Option<&str>,
        workspace: &RunWorkspace,
        listener: &dyn StageListener,
    ) -> Result<String> {
        validate_url(url)?;
        let language = normalize_language(language.unwrap_or(&self.default_language));
        info!("Starting summary run {} for {} ({})", workspace.run_id(), url, language);

        listener.on_stage(Stage::Acquiring).await;
        let scratch = workspace.scratch()?;
        let audio_path = self
            .retry
            .run("audio download", |_| self.acquirer.acquire_audio(url.trim(), scratch.path()))
            .await?;

        listener.on_stage(Stage::Transcribing).await;
        let transcript = self.transcriber.transcribe(&audio_path).await?;
        drop(scratch);
        let text = transcript.full_text();
        if text.is_empty() {
            return Err(DublineError::Transcription("no speech detected in source audio".to_string()));
        }

        listener.on_stage(Stage::Summarizing).await;
        let summary = self.model.summarize(&text, self.max_words).await?;
        if summary.is_empty() {
            return Err(DublineError::Summarization("model returned an empty summary".to_string()));
        }
        info!("Summary ({} words): {}", summary.split_whitespace().count(), summary);

        listener.on_stage(Stage::Translating).await;
        let translated = self
            .retry
            .run("summary translation", |_| self.translator.translate(&summary, &language))
            .await?;

        listener.on_stage(Stage::Done).await;
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoopListener;
    use crate::segment::{Segment, Transcript};
    use crate::translate::MockSegmentTranslator;
    use std::path::{Path, PathBuf};

    struct FakeAcquirer;

    #[async_trait]
    impl MediaAcquirer for FakeAcquirer {
        async fn acquire(&self, _url: &str, _dest: &Path) -> Result<()> {
            unreachable!("summaries download audio only")
        }

        async fn acquire_audio(&self, _url: &str, dest_dir: &Path) -> Result<PathBuf> {
            let path = dest_dir.join("audio.wav");
            tokio::fs::write(&path, b"RIFF").await?;
            Ok(path)
        }

        async fn check_availability(&self) -> Result<String> {
            Ok("fake".to_string())
        }
    }

    struct FakeTranscriber(Vec<Segment>);

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
            assert!(audio_path.exists());
            Ok(Transcript::normalized(Some("en".to_string()), self.0.clone()))
        }
    }

    struct EchoModel;

    #[async_trait]
    impl SummaryModel for EchoModel {
        async fn summarize(&self, transcript: &str, max_words: u32) -> Result<String> {
            Ok(format!("{} ({})", transcript, max_words))
        }

        async fn check_availability(&self) -> Result<String> {
            Ok("echo".to_string())
        }
    }

    #[tokio::test]
    async fn test_summary_is_translated_to_default_language() {
        let mut translator = MockSegmentTranslator::new();
        translator
            .expect_translate()
            .times(1)
            .returning(|text, language| {
                assert_eq!(text, "Rust is fast. And safe. (120)");
                assert_eq!(language, "hi");
                Ok("सारांश".to_string())
            });

        let summarizer = Summarizer::new(
            Arc::new(FakeAcquirer),
            Arc::new(FakeTranscriber(vec![
                Segment::new(0.0, 1.0, "Rust is fast."),
                Segment::new(1.0, 2.0, "And safe."),
            ])),
            Arc::new(EchoModel),
            Arc::new(translator),
        );

        let root = tempfile::tempdir().unwrap();
        let workspace = RunWorkspace::create(root.path(), uuid::Uuid::new_v4()).await.unwrap();
        let summary = summarizer
            .summarize("https://youtu.be/abc", None, &workspace, &NoopListener)
            .await
            .unwrap();
        assert_eq!(summary, "सारांश");
    }

    #[tokio::test]
    async fn test_silent_audio_fails_transcription() {
        let summarizer = Summarizer::new(
            Arc::new(FakeAcquirer),
            Arc::new(FakeTranscriber(Vec::new())),
            Arc::new(EchoModel),
            Arc::new(MockSegmentTranslator::new()),
        );

        let root = tempfile::tempdir().unwrap();
        let workspace = RunWorkspace::create(root.path(), uuid::Uuid::new_v4()).await.unwrap();
        let err = summarizer
            .summarize("https://youtu.be/abc", Some("Marathi"), &workspace, &NoopListener)
            .await
            .unwrap_err();
        assert!(matches!(err, DublineError::Transcription(_)));
    }

    #[tokio::test]
    async fn test_check_dependencies_lists_downloader_and_model() {
        let summarizer = Summarizer::new(
            Arc::new(FakeAcquirer),
            Arc::new(FakeTranscriber(Vec::new())),
            Arc::new(EchoModel),
            Arc::new(MockSegmentTranslator::new()),
        );
        let versions = summarizer.check_dependencies().await.unwrap();
        assert_eq!(versions, vec!["fake".to_string(), "echo".to_string()]);
    }

    #[test]
    fn test_prompt_mentions_word_limit() {
        let prompt = OllamaSummaryModel::build_prompt("long talk", 80);
        assert!(prompt.contains("at most 80 words"));
        assert!(prompt.ends_with("long talk"));
    }
}
