//! Extraction backend configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the AI extraction backend client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBackendConfig {
    /// API endpoint (Ollama-compatible).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used for text documents (schema-constrained output).
    #[serde(default = "default_model")]
    pub model: String,
    /// Vision-capable model used for binary/image/PDF documents.
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// Temperature for generation (0.0 - 1.0). Extraction wants determinism.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Single-call timeout in seconds. The backend call is the only long
    /// block in the pipeline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum characters of document text to send.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_vision_model() -> String {
    "llama3.2-vision:11b".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_content_chars() -> usize {
    24_000
}

impl Default for ExtractionBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            vision_model: default_vision_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
        }
    }
}
