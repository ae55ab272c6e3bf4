//! LLM rewrite step used by fork/improve, with a regression guard.
//!
//! A rewrite is only published when it scores at least as well as the text
//! it replaces; otherwise the caller keeps the un-rewritten text.

use std::sync::Arc;
use std::time::Duration;

use promptlab_core::revision::accept_rewrite;
use promptlab_llm::{ChatMessage, CompletionRequest, LlmBackend, LlmConfig, LlmError};

use crate::error::PipelineError;
use crate::scoring::{ScoringEngine, SCORING_LLM_TIMEOUT};

/// Deadline for the rewrite LLM call.
pub const REWRITE_LLM_TIMEOUT: Duration = Duration::from_secs(45);

/// Longest [`Rewriter::improve`] can take: the rewrite call, then both
/// texts scored concurrently.
pub const MAX_IMPROVE_DURATION: Duration =
    Duration::from_secs(REWRITE_LLM_TIMEOUT.as_secs() + SCORING_LLM_TIMEOUT.as_secs());

const REWRITE_INSTRUCTIONS: &str = "\
You improve prompts written for large language models.

Rewrite the prompt supplied by the user so that it applies the requested changes.
Keep the author's intent, language and any [PLACEHOLDERS]. Prefer a structure with
\"# Identity\", \"# Instructions\" (bullet points) and \"# Context\" sections and explicit
\"Do not\" constraints where they help.

Return only the rewritten prompt text, without commentary or code fences.";

/// Result of an improvement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Text to publish.
    pub text: String,
    /// Whether `text` is the LLM rewrite (as opposed to the input).
    pub rewritten: bool,
}

impl RewriteOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            rewritten: false,
        }
    }
}

pub struct Rewriter {
    backend: Option<Arc<dyn LlmBackend>>,
    temperature: f32,
    timeout: Duration,
}

impl Rewriter {
    pub fn new(backend: Option<Arc<dyn LlmBackend>>, config: &LlmConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            timeout: REWRITE_LLM_TIMEOUT,
        }
    }

    /// Try to improve `text` using the applied suggestions and free-text
    /// notes. Both texts are scored and the rewrite is kept only if it does
    /// not score lower. Never fails; without a backend or on any LLM error
    /// the input is returned unchanged.
    pub async fn improve(
        &self,
        scoring: &ScoringEngine,
        text: &str,
        notes: Option<&str>,
        applied_suggestions: &[String],
    ) -> RewriteOutcome {
        let Some(backend) = &self.backend else {
            return RewriteOutcome::unchanged(text);
        };

        let candidate = match self
            .request_rewrite(backend.as_ref(), text, notes, applied_suggestions)
            .await
        {
            Ok(candidate) if candidate.trim() != text.trim() => candidate,
            Ok(_) => return RewriteOutcome::unchanged(text),
            Err(e) => {
                tracing::warn!(error = %e, "Prompt rewrite failed, keeping original text");
                return RewriteOutcome::unchanged(text);
            }
        };

        let (original, rewritten) = tokio::join!(scoring.evaluate(text), scoring.evaluate(&candidate));
        let (original_score, rewritten_score) = (original.aggregate(), rewritten.aggregate());

        if accept_rewrite(original_score, rewritten_score) {
            tracing::debug!(original_score, rewritten_score, "Rewrite accepted");
            RewriteOutcome {
                text: candidate,
                rewritten: true,
            }
        } else {
            tracing::info!(original_score, rewritten_score, "Rewrite scored lower, discarded");
            RewriteOutcome::unchanged(text)
        }
    }

    async fn request_rewrite(
        &self,
        backend: &dyn LlmBackend,
        text: &str,
        notes: Option<&str>,
        applied_suggestions: &[String],
    ) -> Result<String, PipelineError> {
        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(REWRITE_INSTRUCTIONS),
                ChatMessage::user(build_rewrite_message(text, notes, applied_suggestions)),
            ],
            self.timeout,
        )
        .with_temperature(self.temperature);

        let rewritten = tokio::time::timeout(self.timeout, backend.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;
        Ok(rewritten)
    }
}

fn build_rewrite_message(text: &str, notes: Option<&str>, applied_suggestions: &[String]) -> String {
    let mut message = format!("Prompt:\n{text}\n");
    if !applied_suggestions.is_empty() {
        message.push_str("\nApply these suggestions:\n");
        for suggestion in applied_suggestions {
            message.push_str(&format!("- {suggestion}\n"));
        }
    }
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        message.push_str(&format!("\nAuthor's notes:\n{notes}\n"));
    }
    message
}
