//! Client for the AI extraction backend.
//!
//! Supports an Ollama-compatible API. Text documents go through a
//! schema-constrained generate call (`format: "json"`); binary documents
//! go through the vision model with the content attached as base64 images.
//! Each extraction attempt makes exactly one call; failures surface to the
//! caller without retry.

mod config;
mod prompts;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use config::ExtractionBackendConfig;

/// Errors from the extraction backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("backend error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

/// HTTP client for the extraction backend.
pub struct ExtractionClient {
    config: ExtractionBackendConfig,
    client: Client,
}

impl ExtractionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ExtractionBackendConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    pub fn config(&self) -> &ExtractionBackendConfig {
        &self.config
    }

    /// Check if the backend is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Extract from a plain-text document via the structured-output call.
    pub async fn extract_text(&self, content: &str) -> Result<String, LlmError> {
        let truncated = self.truncate_content(content);
        let prompt = prompts::text_prompt(truncated);

        debug!("Requesting text extraction ({} chars)", truncated.len());
        self.generate(&self.config.model, prompt, None).await
    }

    /// Extract from a binary/image/PDF document via the vision call.
    pub async fn extract_document(&self, content: &[u8]) -> Result<String, LlmError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let prompt = prompts::vision_prompt();

        debug!("Requesting vision extraction ({} bytes)", content.len());
        self.generate(&self.config.vision_model, prompt, Some(vec![encoded]))
            .await
    }

    /// Truncate content to configured maximum (UTF-8 safe).
    fn truncate_content<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.config.max_content_chars {
            return text;
        }
        let mut end = self.config.max_content_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    /// Single generate call against the backend.
    async fn generate(
        &self,
        model: &str,
        prompt: String,
        images: Option<Vec<String>>,
    ) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            format: Some("json".to_string()),
            images,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shapes() {
        // Text call: json format, no images
        let request = OllamaRequest {
            model: "llama3.1:8b".to_string(),
            prompt: "extract".to_string(),
            stream: false,
            format: Some("json".to_string()),
            images: None,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: 2048,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["format"], "json");
        assert!(json.get("images").is_none());

        // Vision call carries base64 images
        let request = OllamaRequest {
            images: Some(vec!["aGVsbG8=".to_string()]),
            ..request
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_truncate_content_utf8_boundary() {
        let config = ExtractionBackendConfig {
            max_content_chars: 5,
            ..Default::default()
        };
        let client = ExtractionClient::new(config);
        // Multi-byte char straddles the cut point
        let truncated = client.truncate_content("ab\u{00e9}cdef");
        assert!(truncated.len() <= 5);
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
    }
}
