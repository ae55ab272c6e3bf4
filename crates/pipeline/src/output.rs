//! Output Generator: a sample completion for the prompt, or a simulated
//! placeholder when the LLM is unavailable.

use std::sync::Arc;
use std::time::Duration;

use promptlab_core::simulation::{simulated_output, SIMULATION_DELAY};
use promptlab_llm::{ChatMessage, CompletionRequest, LlmBackend, LlmConfig, LlmError};

/// Deadline for the output LLM call.
pub const OUTPUT_LLM_TIMEOUT: Duration = Duration::from_secs(75);

pub struct OutputGenerator {
    backend: Option<Arc<dyn LlmBackend>>,
    temperature: f32,
    timeout: Duration,
}

impl OutputGenerator {
    /// `backend = None` runs in simulation mode.
    pub fn new(backend: Option<Arc<dyn LlmBackend>>, config: &LlmConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            timeout: OUTPUT_LLM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a sample output. Never fails.
    ///
    /// The prompt is sent as a single user message without a system wrapper.
    /// In simulation mode this is [`simulate`](Self::simulate).
    pub async fn generate(&self, text: &str) -> String {
        let Some(backend) = &self.backend else {
            return self.simulate(text).await;
        };

        let request = CompletionRequest::new(vec![ChatMessage::user(text)], self.timeout)
            .with_temperature(self.temperature);
        let result = tokio::time::timeout(self.timeout, backend.complete(request))
            .await
            .unwrap_or(Err(LlmError::Timeout(self.timeout)));

        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    model = backend.model(),
                    error = %e,
                    "LLM output generation failed, using simulated output",
                );
                simulated_output(text)
            }
        }
    }

    /// Simulated output after a short artificial processing delay.
    pub async fn simulate(&self, text: &str) -> String {
        tokio::time::sleep(SIMULATION_DELAY).await;
        simulated_output(text)
    }
}
