//! Repository for the `prompts` table.
//!
//! Operations that touch more than one table (creation with the first
//! version, starting a new version, cloning) run in a single transaction.

use promptlab_core::revision::FIRST_VERSION;
use promptlab_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::evaluation::SOURCE_PLACEHOLDER;
use crate::models::prompt::{CreatePrompt, Prompt, UpdatePromptMetadata};
use crate::models::prompt_version::PromptVersion;

/// Column list for prompts queries.
const COLUMNS: &str = "id, title, description, industry, prompt_text, is_public, \
    owner_id, score, impressions, generation, forked_from_id, created_at, updated_at";

/// Column list for prompt_versions rows returned from this repository.
const VERSION_COLUMNS: &str = "id, prompt_id, version_number, prompt_text, score, created_at";

/// Provides CRUD and revision operations for prompts.
pub struct PromptRepo;

impl PromptRepo {
    /// Insert a prompt together with version 1, returning both rows.
    pub async fn create_with_first_version(
        pool: &PgPool,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let (prompt, version) = insert_prompt_and_first_version(&mut *tx, input).await?;
        tx.commit().await?;
        Ok((prompt, version))
    }

    /// Find a prompt by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Prompt>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompts WHERE id = $1");
        sqlx::query_as::<_, Prompt>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List public prompts, newest first, optionally filtered by industry.
    pub async fn list_public(
        pool: &PgPool,
        industry: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prompt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompts
             WHERE is_public = true
               AND ($1::TEXT IS NULL OR industry = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(industry)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List prompts owned by a user, most recently updated first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prompt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompts
             WHERE owner_id = $1
             ORDER BY updated_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update title, description, industry or visibility. Only non-`None`
    /// fields are applied. Returns `None` if the prompt does not exist.
    pub async fn update_metadata(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePromptMetadata,
    ) -> Result<Option<Prompt>, sqlx::Error> {
        let query = format!(
            "UPDATE prompts SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                industry = COALESCE($4, industry),
                is_public = COALESCE($5, is_public),
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.industry)
            .bind(input.is_public)
            .fetch_optional(pool)
            .await
    }

    /// Start a new version of a prompt.
    ///
    /// Locks the prompt row, replaces its text, resets the score to 0 and
    /// advances `generation` to the new version number. The evaluation is
    /// reset to a zeroed placeholder and the output text is blanked, both
    /// stamped with the new generation so that results of older runs can no
    /// longer land. Suggestions are deleted.
    ///
    /// Returns `None` if the prompt does not exist.
    pub async fn begin_new_version(
        pool: &PgPool,
        id: DbId,
        prompt_text: &str,
    ) -> Result<Option<PromptVersion>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM prompts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let next: (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version_number), 0) + 1 \
             FROM prompt_versions WHERE prompt_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let version_number = next.0;

        sqlx::query(
            "UPDATE prompts SET prompt_text = $2, score = 0, generation = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(prompt_text)
        .bind(version_number)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO prompt_versions (prompt_id, version_number, prompt_text, score)
             VALUES ($1, $2, $3, 0)
             RETURNING {VERSION_COLUMNS}"
        );
        let version = sqlx::query_as::<_, PromptVersion>(&query)
            .bind(id)
            .bind(version_number)
            .bind(prompt_text)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO prompt_evaluations
                (prompt_id, clarity_score, specificity_score, contextual_score,
                 effectiveness_score, feedback, source, generation)
             VALUES ($1, 0, 0, 0, 0, '[]'::jsonb, $2, $3)
             ON CONFLICT (prompt_id) DO UPDATE SET
                clarity_score = 0,
                specificity_score = 0,
                contextual_score = 0,
                effectiveness_score = 0,
                feedback = '[]'::jsonb,
                source = EXCLUDED.source,
                generation = EXCLUDED.generation,
                updated_at = now()",
        )
        .bind(id)
        .bind(SOURCE_PLACEHOLDER)
        .bind(version_number)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO prompt_outputs (prompt_id, output_text, generation)
             VALUES ($1, '', $2)
             ON CONFLICT (prompt_id) DO UPDATE SET
                output_text = '',
                generation = EXCLUDED.generation,
                updated_at = now()",
        )
        .bind(id)
        .bind(version_number)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM improvement_suggestions WHERE prompt_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(version))
    }

    /// Latest version number of a prompt, or `None` if it has no versions.
    pub async fn latest_version_number(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: (Option<i32>,) =
            sqlx::query_as("SELECT MAX(version_number) FROM prompt_versions WHERE prompt_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Bump the impressions counter.
    pub async fn increment_impressions(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE prompts SET impressions = impressions + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a prompt. Versions, results and favorites cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clone a prompt and its processing results into a new prompt.
    ///
    /// The clone gets a single version 1 at `input.score`, and verbatim
    /// copies of the source's evaluation, output and suggestions (stamped
    /// with generation 1). Everything happens in one transaction: either the
    /// clone is complete or nothing is written.
    pub async fn clone_prompt(
        pool: &PgPool,
        source_id: DbId,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (prompt, version) = insert_prompt_and_first_version(&mut *tx, input).await?;

        sqlx::query(
            "INSERT INTO prompt_evaluations
                (prompt_id, clarity_score, specificity_score, contextual_score,
                 effectiveness_score, feedback, source, generation)
             SELECT $2, clarity_score, specificity_score, contextual_score,
                    effectiveness_score, feedback, source, $3
             FROM prompt_evaluations WHERE prompt_id = $1",
        )
        .bind(source_id)
        .bind(prompt.id)
        .bind(FIRST_VERSION)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO prompt_outputs (prompt_id, output_text, generation)
             SELECT $2, output_text, $3
             FROM prompt_outputs WHERE prompt_id = $1",
        )
        .bind(source_id)
        .bind(prompt.id)
        .bind(FIRST_VERSION)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO improvement_suggestions
                (prompt_id, section, priority, suggestion_text, sort_order)
             SELECT $2, section, priority, suggestion_text, sort_order
             FROM improvement_suggestions WHERE prompt_id = $1",
        )
        .bind(source_id)
        .bind(prompt.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((prompt, version))
    }
}

/// Insert the prompt row and its version 1 on an open transaction.
async fn insert_prompt_and_first_version(
    conn: &mut PgConnection,
    input: &CreatePrompt,
) -> Result<(Prompt, PromptVersion), sqlx::Error> {
    let query = format!(
        "INSERT INTO prompts
            (title, description, industry, prompt_text, is_public,
             owner_id, score, generation, forked_from_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {COLUMNS}"
    );
    let prompt = sqlx::query_as::<_, Prompt>(&query)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.industry)
        .bind(&input.prompt_text)
        .bind(input.is_public)
        .bind(input.owner_id)
        .bind(input.score)
        .bind(FIRST_VERSION)
        .bind(input.forked_from_id)
        .fetch_one(&mut *conn)
        .await?;

    let query = format!(
        "INSERT INTO prompt_versions (prompt_id, version_number, prompt_text, score)
         VALUES ($1, $2, $3, $4)
         RETURNING {VERSION_COLUMNS}"
    );
    let version = sqlx::query_as::<_, PromptVersion>(&query)
        .bind(prompt.id)
        .bind(FIRST_VERSION)
        .bind(&input.prompt_text)
        .bind(input.score)
        .fetch_one(&mut *conn)
        .await?;

    Ok((prompt, version))
}
