use promptlab_core::error::CoreError;
use promptlab_llm::LlmError;

/// Errors surfaced by pipeline operations.
///
/// Only the synchronous half of a revision (validation, the initial insert)
/// returns these to callers. Failures inside background runs are logged and
/// recorded on the task instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
