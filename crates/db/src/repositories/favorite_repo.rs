//! Repository for the `favorites` table.

use promptlab_core::types::DbId;
use sqlx::PgPool;

use crate::models::prompt::Prompt;

pub struct FavoriteRepo;

impl FavoriteRepo {
    /// Mark a prompt as a favorite. Idempotent; returns `true` if a new row
    /// was inserted.
    pub async fn add(pool: &PgPool, user_id: DbId, prompt_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, prompt_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, prompt_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(prompt_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a favorite. Returns `true` if a row was deleted.
    pub async fn remove(
        pool: &PgPool,
        user_id: DbId,
        prompt_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND prompt_id = $2")
            .bind(user_id)
            .bind(prompt_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Prompts a user has favorited and can still see, most recent first.
    pub async fn list_prompts_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prompt>, sqlx::Error> {
        sqlx::query_as::<_, Prompt>(
            "SELECT p.id, p.title, p.description, p.industry, p.prompt_text, p.is_public,
                    p.owner_id, p.score, p.impressions, p.generation, p.forked_from_id,
                    p.created_at, p.updated_at
             FROM favorites f
             JOIN prompts p ON p.id = f.prompt_id
             WHERE f.user_id = $1
               AND (p.is_public OR p.owner_id = $1)
             ORDER BY f.created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Whether the user has favorited the prompt.
    pub async fn exists(pool: &PgPool, user_id: DbId, prompt_id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND prompt_id = $2)",
        )
        .bind(user_id)
        .bind(prompt_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
