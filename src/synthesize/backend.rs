use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::audio::AudioClip;
use super::voice::VoiceProfile;
use crate::config::SynthesisConfig;
use crate::error::{DublineError, Result};

/// Turns one piece of text into speech
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<AudioClip>;

    /// Check if the backend is reachable; returns a short description of it
    async fn check_availability(&self) -> Result<String>;
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    /// Built-in speaker name, or "default" for free-text descriptions
    pub voice: &'a str,
    /// Natural-language voice description
    pub description: &'a str,
    pub language: &'a str,
    pub response_format: &'a str,
}

/// TTS server speaking the OpenAI-style `/v1/audio/speech` protocol
pub struct HttpSpeechBackend {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpSpeechBackend {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn build_request<'a>(&'a self, text: &'a str, voice: &'a VoiceProfile) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            input: text,
            voice: voice.speaker.as_deref().unwrap_or("default"),
            description: &voice.description,
            language: &voice.language,
            response_format: "wav",
        }
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<AudioClip> {
        let url = format!("{}/v1/audio/speech", self.endpoint);
        debug!("Sending speech request to: {} ({} chars)", url, text.chars().count());

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(text, voice))
            .send()
            .await
            .map_err(|e| DublineError::synthesis(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DublineError::synthesis(format!(
                "TTS service error {}: {}",
                status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DublineError::synthesis(format!("Failed to read audio body: {}", e)))?;

        AudioClip::from_wav_bytes(&bytes)
    }

    async fn check_availability(&self) -> Result<String> {
        let url = format!("{}/v1/models", self.endpoint);
        self.client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                DublineError::Config(format!("TTS service not reachable at {}: {}", self.endpoint, e))
            })?;
        Ok(format!("TTS service {} (model {})", self.endpoint, self.model))
    }
}
