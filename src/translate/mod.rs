// Segment translation
//
// - google: Google Translate web endpoint (one request per segment)
// - ollama: local LLM translation through ollama
//
// Every segment is translated with an independent, stateless request.

pub mod google;
pub mod ollama;

use async_trait::async_trait;
use tracing::info;

use crate::config::{TranslateConfig, TranslationBackend};
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::segment::{Segment, Transcript};

pub use google::GoogleTranslator;
pub use ollama::OllamaTranslator;

/// Translates a single text into the target language
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentTranslator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: &TranslateConfig) -> Result<Box<dyn SegmentTranslator>> {
        Ok(match config.backend {
            TranslationBackend::Google => Box::new(GoogleTranslator::new(config)?),
            TranslationBackend::Ollama => Box::new(OllamaTranslator::new(config)?),
        })
    }
}

/// Translate every segment in order, preserving timing.
///
/// The first segment that still fails after retries aborts the whole sequence
/// and segments already translated in this call are dropped.
pub async fn translate_segments(
    translator: &dyn SegmentTranslator,
    transcript: &Transcript,
    target_language: &str,
    retry: &RetryPolicy,
) -> Result<Vec<Segment>> {
    info!(
        "Translating {} segments to {}",
        transcript.len(),
        target_language
    );

    let total = transcript.len();
    let mut translated = Vec::with_capacity(total);
    for (idx, segment) in transcript.segments.iter().enumerate() {
        let text = segment.original_text.trim();
        let translation = if text.is_empty() {
            String::new()
        } else {
            retry
                .run("translation", |_| translator.translate(text, target_language))
                .await
                .map_err(|e| e.at_segment(idx + 1))?
        };

        info!("┌─ Segment {}/{} ────────", idx + 1, total);
        info!("│ Source: {}", text);
        info!("│ Target: {}", translation);
        info!("└─────────────────────────────────────");

        translated.push(segment.clone().with_translation(translation));
    }

    Ok(translated)
}
