//! Persistence seam used by the pipeline.
//!
//! [`PgPromptStore`] delegates to the `promptlab-db` repositories. Tests
//! substitute an in-memory implementation.

use async_trait::async_trait;
use promptlab_core::scoring::{Evaluation, SubScores};
use promptlab_core::types::DbId;
use promptlab_db::models::prompt::{CreatePrompt, Prompt};
use promptlab_db::models::prompt_version::PromptVersion;
use promptlab_db::repositories::{EvaluationRepo, OutputRepo, PromptRepo};
use promptlab_db::DbPool;

use crate::error::PipelineError;

/// What the status reporter needs to know about a prompt's results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingState {
    /// Sub-scores of the evaluation row, if one exists.
    pub scores: Option<SubScores>,
    /// Text of the output row, if one exists and is not null.
    pub output_text: Option<String>,
}

#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn find_prompt(&self, id: DbId) -> Result<Option<Prompt>, PipelineError>;

    /// Insert a prompt and its version 1.
    async fn create_prompt(
        &self,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError>;

    /// Insert a prompt and its version 1 with the source's results copied.
    async fn clone_prompt(
        &self,
        source_id: DbId,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError>;

    /// Replace the text and reset results to the processing placeholder.
    /// `None` if the prompt does not exist.
    async fn begin_new_version(
        &self,
        id: DbId,
        prompt_text: &str,
    ) -> Result<Option<PromptVersion>, PipelineError>;

    async fn latest_version_number(&self, id: DbId) -> Result<Option<i32>, PipelineError>;

    /// Returns `false` when the write was discarded (stale or already present).
    async fn record_evaluation(
        &self,
        prompt_id: DbId,
        generation: i32,
        evaluation: &Evaluation,
        replace_existing: bool,
    ) -> Result<bool, PipelineError>;

    /// Returns `false` when the write was discarded (stale or already present).
    async fn record_output(
        &self,
        prompt_id: DbId,
        generation: i32,
        output_text: &str,
        replace_existing: bool,
    ) -> Result<bool, PipelineError>;

    async fn processing_state(&self, prompt_id: DbId) -> Result<ProcessingState, PipelineError>;
}

/// PostgreSQL-backed [`PromptStore`].
#[derive(Clone)]
pub struct PgPromptStore {
    pool: DbPool,
}

impl PgPromptStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromptStore for PgPromptStore {
    async fn find_prompt(&self, id: DbId) -> Result<Option<Prompt>, PipelineError> {
        Ok(PromptRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_prompt(
        &self,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError> {
        Ok(PromptRepo::create_with_first_version(&self.pool, input).await?)
    }

    async fn clone_prompt(
        &self,
        source_id: DbId,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError> {
        Ok(PromptRepo::clone_prompt(&self.pool, source_id, input).await?)
    }

    async fn begin_new_version(
        &self,
        id: DbId,
        prompt_text: &str,
    ) -> Result<Option<PromptVersion>, PipelineError> {
        Ok(PromptRepo::begin_new_version(&self.pool, id, prompt_text).await?)
    }

    async fn latest_version_number(&self, id: DbId) -> Result<Option<i32>, PipelineError> {
        Ok(PromptRepo::latest_version_number(&self.pool, id).await?)
    }

    async fn record_evaluation(
        &self,
        prompt_id: DbId,
        generation: i32,
        evaluation: &Evaluation,
        replace_existing: bool,
    ) -> Result<bool, PipelineError> {
        Ok(
            EvaluationRepo::record(&self.pool, prompt_id, generation, evaluation, replace_existing)
                .await?,
        )
    }

    async fn record_output(
        &self,
        prompt_id: DbId,
        generation: i32,
        output_text: &str,
        replace_existing: bool,
    ) -> Result<bool, PipelineError> {
        Ok(
            OutputRepo::record(&self.pool, prompt_id, generation, output_text, replace_existing)
                .await?,
        )
    }

    async fn processing_state(&self, prompt_id: DbId) -> Result<ProcessingState, PipelineError> {
        let (evaluation, output) = tokio::try_join!(
            EvaluationRepo::find_for_prompt(&self.pool, prompt_id),
            OutputRepo::find_for_prompt(&self.pool, prompt_id),
        )?;
        Ok(ProcessingState {
            scores: evaluation.map(|e| e.sub_scores()),
            output_text: output.and_then(|o| o.output_text),
        })
    }
}
