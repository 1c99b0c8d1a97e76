use async_trait::async_trait;
use std::time::Duration;

use super::SegmentTranslator;
use crate::config::TranslateConfig;
use crate::error::{DublineError, Result};
use crate::ollama::{extract_text_field, OllamaClient};

/// Segment translation with a local LLM; no context from neighbouring segments
pub struct OllamaTranslator {
    client: OllamaClient,
}

impl OllamaTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(
                &config.ollama_endpoint,
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?,
        })
    }

    pub fn build_prompt(text: &str, target_language: &str) -> String {
        format!(
            "Translate the following text into the language with ISO 639-1 code '{}'.\n\
             Output only the translation, with no explanations or notes.\n\
             Return the result as JSON: {{\"text\": \"translated text\"}}\n\
             \n\
             [Text]\n\
             {}",
            target_language, text
        )
    }
}

#[async_trait]
impl SegmentTranslator for OllamaTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let raw = self
            .client
            .generate(Self::build_prompt(text, target_language), true)
            .await
            .map_err(|f| {
                if f.transient {
                    DublineError::translation_unavailable(f.message)
                } else {
                    DublineError::translation(f.message)
                }
            })?;

        let translation = extract_text_field(&raw);
        if translation.is_empty() {
            return Err(DublineError::translation("Empty translation received"));
        }
        Ok(translation)
    }
}
