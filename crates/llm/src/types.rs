//! LLM Provider Types
//!
//! The single-capability request/response shape every provider speaks:
//! `generate(prompt, system_prompt?, options) -> {content, success, error?, metadata}`.
//! Concrete wire formats (chat history, tool calling, multimodal content)
//! are out of scope here by design — providers translate this shape into
//! whatever their API expects internally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    3
}

/// Options recognized by every provider's `generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Override the provider's configured model for this call only.
    pub model_id: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            model_id: None,
            max_retries: default_max_retries(),
        }
    }
}

/// A provider's response to one `generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl GenerateResponse {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            error: None,
            metadata: serde_json::Map::new(),
        }
    }
}

/// One chunk of a streamed `generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateChunk {
    pub delta: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },
    #[error("rate limited: {message}")]
    RateLimited { message: String, retry_after: Option<u64> },
    #[error("model not found: {model}")]
    ModelNotFound { model: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("server error ({status:?}): {message}")]
    ServerError { message: String, status: Option<u16> },
    #[error("request error: {0}")]
    Transport(String),
    #[error("{message}")]
    Other { message: String },
}

impl LlmError {
    /// Transient errors are retried with exponential backoff; everything
    /// else propagates immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::ServerError { .. } | LlmError::Transport(_))
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
