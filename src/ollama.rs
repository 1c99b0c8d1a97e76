use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DublineError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Failure talking to ollama, before it is attributed to a pipeline stage.
#[derive(Debug)]
pub struct OllamaFailure {
    pub message: String,
    pub transient: bool,
}

/// Minimal client for ollama's `/api/generate`
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: String, json: bool) -> std::result::Result<String, OllamaFailure> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            format: json.then(|| "json".to_string()),
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending generate request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaFailure {
                message: format!("HTTP request failed: {}", e),
                transient: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OllamaFailure {
                message: format!("Ollama API error {}: {}", status, error_text),
                transient: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| OllamaFailure {
            message: format!("Failed to parse response: {}", e),
            transient: false,
        })?;

        let raw = body.response.trim().to_string();
        debug!("Raw ollama response: {}", raw);
        if raw.is_empty() {
            return Err(OllamaFailure {
                message: "Empty response received".to_string(),
                transient: true,
            });
        }
        Ok(raw)
    }

    /// Confirm the server answers and has the configured model pulled.
    pub async fn check_availability(&self) -> Result<()> {
        #[derive(Deserialize)]
        struct Tags {
            models: Vec<Model>,
        }
        #[derive(Deserialize)]
        struct Model {
            name: String,
        }

        let url = format!("{}/api/tags", self.endpoint);
        let tags: Tags = self.client.get(&url).send().await?.error_for_status()?.json().await?;
        if tags.models.iter().any(|m| m.name == self.model) {
            Ok(())
        } else {
            Err(DublineError::Config(format!(
                "ollama model '{}' is not available at {}",
                self.model, self.endpoint
            )))
        }
    }
}

/// Pulls `{"text": ...}` out of a JSON-mode answer, falling back to the raw text.
pub fn extract_text_field(raw: &str) -> String {
    #[derive(Deserialize)]
    struct TextField {
        text: String,
    }

    match serde_json::from_str::<TextField>(raw) {
        Ok(parsed) => parsed.text.trim().to_string(),
        Err(_) => clean_response(raw),
    }
}

/// Strip wrapping quotes and common "Translation:" style prefixes.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim();
    for prefix in ["Translation:", "Summary:", "Here is the translation:", "Here is the summary:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
        }
    }
    text.trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_field_prefers_json() {
        assert_eq!(extract_text_field(r#"{"text": " नमस्ते "}"#), "नमस्ते");
        assert_eq!(extract_text_field("\"Translation: bonjour\""), "Translation: bonjour");
        assert_eq!(extract_text_field("Translation: bonjour"), "bonjour");
    }

    #[test]
    fn test_generate_request_omits_format_when_plain() {
        let request = GenerateRequest {
            model: "llama3.2:3b".to_string(),
            prompt: "hi".to_string(),
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
    }
}
