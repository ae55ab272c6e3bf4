//! Large-language-model access for the prompt pipeline.
//!
//! The pipeline depends only on the [`LlmBackend`] trait. Production code
//! uses [`api::ChatCompletionsClient`], an OpenAI-compatible HTTP client;
//! tests substitute their own implementations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod api;
pub mod config;

pub use api::ChatCompletionsClient;
pub use config::LlmConfig;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature. `None` uses the backend's default.
    pub temperature: Option<f32>,
    /// Ask the provider to return a JSON object.
    pub json_mode: bool,
    /// Per-call deadline enforced by the backend.
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, timeout: Duration) -> Self {
        Self {
            messages,
            temperature: None,
            json_mode: false,
            timeout,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the LLM layer. All of them are recoverable: callers fall
/// back to heuristics or simulated output.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response carried no usable completion text.
    #[error("LLM returned an empty completion")]
    EmptyCompletion,

    /// The call did not finish within its deadline.
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    /// No API key or an unusable configuration.
    #[error("LLM misconfigured: {0}")]
    Misconfigured(String),
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A chat-completion provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one completion and return the assistant's text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
