use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::SegmentTranslator;
use crate::config::TranslateConfig;
use crate::error::{DublineError, Result};

/// Google Translate through the public `translate_a/single` endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.google_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// The response is a nested array; sentence chunks live in `[0][i][0]`.
    pub fn parse_response(body: &Value) -> Result<String> {
        let chunks = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| DublineError::translation("unexpected response shape from Google Translate"))?;

        let text: String = chunks
            .iter()
            .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
            .collect();

        if text.trim().is_empty() {
            return Err(DublineError::translation("Empty translation received"));
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SegmentTranslator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                let message = format!("HTTP request failed: {}", e);
                if e.is_timeout() || e.is_connect() {
                    DublineError::translation_unavailable(message)
                } else {
                    DublineError::translation(message)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = format!("Google Translate error {} for language '{}': {}", status, target_language, error_text);
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                DublineError::translation_unavailable(message)
            } else {
                DublineError::translation(message)
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DublineError::translation(format!("Failed to parse response: {}", e)))?;

        Self::parse_response(&body)
    }
}
