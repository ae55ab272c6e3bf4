//! Repository for the `prompt_evaluations` table.
//!
//! Writes are generation-guarded: a row stamped with a higher generation is
//! never overwritten by a result computed for an older version.

use promptlab_core::scoring::Evaluation;
use promptlab_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::evaluation::PromptEvaluation;
use crate::repositories::suggestion_repo;

/// Column list for prompt_evaluations queries.
const COLUMNS: &str = "id, prompt_id, clarity_score, specificity_score, contextual_score, \
    effectiveness_score, feedback, source, generation, created_at, updated_at";

pub struct EvaluationRepo;

impl EvaluationRepo {
    /// The evaluation row of a prompt, if any.
    pub async fn find_for_prompt(
        pool: &PgPool,
        prompt_id: DbId,
    ) -> Result<Option<PromptEvaluation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompt_evaluations WHERE prompt_id = $1");
        sqlx::query_as::<_, PromptEvaluation>(&query)
            .bind(prompt_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist a finished evaluation for `generation` of a prompt.
    ///
    /// In one transaction: upsert the evaluation row, replace the suggestion
    /// set, update `prompts.score` and the score of the matching version.
    ///
    /// With `replace_existing = false` an existing row is left untouched.
    /// With `replace_existing = true` the row is replaced unless it already
    /// belongs to a newer generation. Returns `false` (and writes nothing)
    /// when the result was discarded.
    pub async fn record(
        pool: &PgPool,
        prompt_id: DbId,
        generation: i32,
        evaluation: &Evaluation,
        replace_existing: bool,
    ) -> Result<bool, sqlx::Error> {
        let conflict = if replace_existing {
            "ON CONFLICT (prompt_id) DO UPDATE SET
                clarity_score = EXCLUDED.clarity_score,
                specificity_score = EXCLUDED.specificity_score,
                contextual_score = EXCLUDED.contextual_score,
                effectiveness_score = EXCLUDED.effectiveness_score,
                feedback = EXCLUDED.feedback,
                source = EXCLUDED.source,
                generation = EXCLUDED.generation,
                updated_at = now()
             WHERE prompt_evaluations.generation <= EXCLUDED.generation"
        } else {
            "ON CONFLICT (prompt_id) DO NOTHING"
        };

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO prompt_evaluations
                (prompt_id, clarity_score, specificity_score, contextual_score,
                 effectiveness_score, feedback, source, generation)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             {conflict}"
        );
        let scores = &evaluation.scores;
        let result = sqlx::query(&query)
            .bind(prompt_id)
            .bind(scores.clarity)
            .bind(scores.specificity)
            .bind(scores.contextual)
            .bind(scores.effectiveness)
            .bind(Json(&evaluation.feedback))
            .bind(evaluation.source.as_str())
            .bind(generation)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        suggestion_repo::replace_in_tx(&mut *tx, prompt_id, &evaluation.suggestions).await?;

        let aggregate = evaluation.aggregate();
        sqlx::query(
            "UPDATE prompts SET score = $2, updated_at = now() \
             WHERE id = $1 AND generation <= $3",
        )
        .bind(prompt_id)
        .bind(aggregate)
        .bind(generation)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE prompt_versions SET score = $3 \
             WHERE prompt_id = $1 AND version_number = $2",
        )
        .bind(prompt_id)
        .bind(generation)
        .bind(aggregate)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
