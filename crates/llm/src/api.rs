//! HTTP client for OpenAI-compatible chat-completions endpoints.
//!
//! Sends `POST {api_url}/chat/completions` with role-tagged messages, the
//! configured model and a temperature, optionally in JSON mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, CONNECT_TIMEOUT};
use crate::{ChatMessage, CompletionRequest, LlmBackend, LlmError};

/// Chat-completions client bound to one provider and model.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    default_temperature: f32,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("default_temperature", &self.default_temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionsClient {
    /// Build a client from configuration. Fails when no API key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Misconfigured("LLM_API_KEY is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, config, api_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &LlmConfig, api_key: String) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            default_temperature: config.temperature,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = build_body(&self.model, request, self.default_temperature);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatCompletionResponse = Self::parse_response(response).await?;
        extract_content(parsed)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, otherwise return
    /// [`LlmError::Api`] with the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LlmError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            json_mode = request.json_mode,
            "Sending chat completion",
        );
        match tokio::time::timeout(request.timeout, self.send(&request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(request.timeout)),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn build_body<'a>(
    model: &'a str,
    request: &'a CompletionRequest,
    default_temperature: f32,
) -> ChatCompletionBody<'a> {
    ChatCompletionBody {
        model,
        messages: &request.messages,
        temperature: request.temperature.unwrap_or(default_temperature),
        response_format: request.json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

/// First choice's content, trimmed. Blank content is an error.
fn extract_content(response: ChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(LlmError::EmptyCompletion)
}
