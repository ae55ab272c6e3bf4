//! Repository for the `prompt_outputs` table.

use promptlab_core::types::DbId;
use sqlx::PgPool;

use crate::models::output::PromptOutput;

/// Column list for prompt_outputs queries.
const COLUMNS: &str = "id, prompt_id, output_text, generation, created_at, updated_at";

pub struct OutputRepo;

impl OutputRepo {
    /// The output row of a prompt, if any.
    pub async fn find_for_prompt(
        pool: &PgPool,
        prompt_id: DbId,
    ) -> Result<Option<PromptOutput>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompt_outputs WHERE prompt_id = $1");
        sqlx::query_as::<_, PromptOutput>(&query)
            .bind(prompt_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist a generated output for `generation` of a prompt.
    ///
    /// Same conflict rules as
    /// [`EvaluationRepo::record`](crate::repositories::EvaluationRepo::record).
    /// Returns `false` when the result was discarded.
    pub async fn record(
        pool: &PgPool,
        prompt_id: DbId,
        generation: i32,
        output_text: &str,
        replace_existing: bool,
    ) -> Result<bool, sqlx::Error> {
        let conflict = if replace_existing {
            "ON CONFLICT (prompt_id) DO UPDATE SET
                output_text = EXCLUDED.output_text,
                generation = EXCLUDED.generation,
                updated_at = now()
             WHERE prompt_outputs.generation <= EXCLUDED.generation"
        } else {
            "ON CONFLICT (prompt_id) DO NOTHING"
        };
        let query = format!(
            "INSERT INTO prompt_outputs (prompt_id, output_text, generation)
             VALUES ($1, $2, $3)
             {conflict}"
        );
        let result = sqlx::query(&query)
            .bind(prompt_id)
            .bind(output_text)
            .bind(generation)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
