//! Scoring Engine: four-axis evaluation through the LLM with a heuristic
//! fallback.

use std::sync::Arc;
use std::time::Duration;

use promptlab_core::scoring::{heuristic_evaluate, parse_llm_evaluation, Evaluation};
use promptlab_llm::{ChatMessage, CompletionRequest, LlmBackend, LlmConfig, LlmError};

use crate::error::PipelineError;

/// Deadline for the scoring LLM call. Stricter than the orchestrator's
/// outer scoring timeout so the write can still complete.
pub const SCORING_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// System prompt describing the rubric and the required JSON shape.
pub const SCORING_RUBRIC: &str = "\
You are an expert prompt engineer who grades prompts written for large language models.

Score the prompt supplied by the user on four axes, each an integer from 0 to 100:
- clarity: is the model's role and the task unambiguous?
- specificity: are requirements, constraints and the expected output explicit?
- contextual: does the prompt give the background the model needs?
- effectiveness: how likely is the prompt to produce consistently useful output?

Use these bands for every axis:
- 90-100: excellent structure (identity, sections, bullet instructions, explicit constraints)
- 80-89: good, minor gaps
- 70-79: decent, several elements missing
- 60-69: basic, little structure
- below 60: poor

Respond with a single JSON object and nothing else:
{
  \"clarity\": <int>,
  \"specificity\": <int>,
  \"contextual\": <int>,
  \"effectiveness\": <int>,
  \"feedback\": [{\"category\": \"strength\" | \"improvement\", \"message\": <string>, \"priority\": \"high\" | \"medium\" | \"low\"}],
  \"suggestions\": [{\"section\": <string>, \"priority\": \"high\" | \"medium\" | \"low\", \"text\": <string>}]
}";

/// Scores prompt text. Never fails: any LLM problem yields the heuristic
/// evaluation instead.
pub struct ScoringEngine {
    backend: Option<Arc<dyn LlmBackend>>,
    temperature: f32,
    timeout: Duration,
}

impl ScoringEngine {
    /// `backend = None` runs in simulation mode (heuristic only).
    pub fn new(backend: Option<Arc<dyn LlmBackend>>, config: &LlmConfig) -> Self {
        Self {
            backend,
            temperature: config.scoring_temperature,
            timeout: SCORING_LLM_TIMEOUT,
        }
    }

    /// Override the LLM call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn evaluate(&self, text: &str) -> Evaluation {
        let Some(backend) = &self.backend else {
            return heuristic_evaluate(text);
        };

        match self.evaluate_with_llm(backend.as_ref(), text).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!(
                    model = backend.model(),
                    error = %e,
                    "LLM scoring failed, using heuristic scorer",
                );
                heuristic_evaluate(text)
            }
        }
    }

    async fn evaluate_with_llm(
        &self,
        backend: &dyn LlmBackend,
        text: &str,
    ) -> Result<Evaluation, PipelineError> {
        let request = CompletionRequest::new(
            vec![ChatMessage::system(SCORING_RUBRIC), ChatMessage::user(text)],
            self.timeout,
        )
        .with_temperature(self.temperature)
        .json();

        let raw = tokio::time::timeout(self.timeout, backend.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;
        Ok(parse_llm_evaluation(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use promptlab_core::scoring::{ScoreSource, MAX_SCORE, MIN_SCORE};

    use super::*;
    use crate::testing::ScriptedBackend;

    fn engine(backend: Arc<ScriptedBackend>) -> ScoringEngine {
        ScoringEngine::new(Some(backend as Arc<dyn LlmBackend>), &LlmConfig::default())
    }

    #[tokio::test]
    async fn uses_llm_scores_and_recomputes_aggregate() {
        let backend = Arc::new(ScriptedBackend::replying(
            r#"{"clarity": 90, "specificity": 80, "contextual": 71, "effectiveness": 88, "overall": 5}"#,
        ));
        let eval = engine(backend.clone()).evaluate("some prompt").await;

        assert_eq!(eval.source, ScoreSource::Llm);
        // (90 + 80 + 71 + 88) / 4 = 82.25
        assert_eq!(eval.aggregate(), 82);

        let request = backend.last_request().unwrap();
        assert!(request.json_mode);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.timeout, SCORING_LLM_TIMEOUT);
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_heuristic() {
        let backend = Arc::new(ScriptedBackend::replying("Great prompt, 9/10!"));
        let eval = engine(backend).evaluate("hi").await;
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert_eq!(eval.aggregate(), 71);
    }

    #[tokio::test]
    async fn json_without_scores_falls_back_to_heuristic() {
        let backend = Arc::new(ScriptedBackend::replying(r#"{"overall": 85, "feedback": []}"#));
        let eval = engine(backend).evaluate("hi").await;
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert!(!eval.scores.is_zeroed());
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_heuristic() {
        let backend = Arc::new(ScriptedBackend::failing());
        let eval = engine(backend.clone()).evaluate("hi").await;
        assert_eq!(eval.source, ScoreSource::Heuristic);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        for s in [
            eval.scores.clarity,
            eval.scores.specificity,
            eval.scores.contextual,
            eval.scores.effectiveness,
        ] {
            assert!((MIN_SCORE..=MAX_SCORE).contains(&s));
        }
    }

    #[tokio::test]
    async fn hanging_backend_times_out_into_heuristic() {
        let backend = Arc::new(ScriptedBackend::hanging());
        let eval = engine(backend)
            .with_timeout(Duration::from_millis(20))
            .evaluate("hi")
            .await;
        assert_eq!(eval.source, ScoreSource::Heuristic);
    }

    #[tokio::test]
    async fn simulation_mode_never_calls_llm() {
        let engine = ScoringEngine::new(None, &LlmConfig::default());
        let eval = engine.evaluate("hi").await;
        assert_eq!(eval.source, ScoreSource::Heuristic);
    }
}
