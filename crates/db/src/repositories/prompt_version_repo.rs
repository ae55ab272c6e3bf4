//! Repository for the `prompt_versions` table.
//!
//! Versions are inserted by [`crate::repositories::PromptRepo`] as part of
//! the revision transactions; this repository only reads them.

use promptlab_core::types::DbId;
use sqlx::PgPool;

use crate::models::prompt_version::PromptVersion;

/// Column list for prompt_versions queries.
const COLUMNS: &str = "id, prompt_id, version_number, prompt_text, score, created_at";

pub struct PromptVersionRepo;

impl PromptVersionRepo {
    /// All versions of a prompt, oldest first.
    pub async fn list_for_prompt(
        pool: &PgPool,
        prompt_id: DbId,
    ) -> Result<Vec<PromptVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_versions
             WHERE prompt_id = $1
             ORDER BY version_number ASC"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(prompt_id)
            .fetch_all(pool)
            .await
    }

    /// Find a specific version of a prompt.
    pub async fn find_by_number(
        pool: &PgPool,
        prompt_id: DbId,
        version_number: i32,
    ) -> Result<Option<PromptVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_versions
             WHERE prompt_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(prompt_id)
            .bind(version_number)
            .fetch_optional(pool)
            .await
    }
}
