//! Repository for the `improvement_suggestions` table.

use promptlab_core::scoring::Suggestion;
use promptlab_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::suggestion::ImprovementSuggestion;

/// Column list for improvement_suggestions queries.
const COLUMNS: &str = "id, prompt_id, section, priority, suggestion_text, sort_order, created_at";

pub struct SuggestionRepo;

impl SuggestionRepo {
    /// Suggestions of a prompt in their stored order.
    pub async fn list_for_prompt(
        pool: &PgPool,
        prompt_id: DbId,
    ) -> Result<Vec<ImprovementSuggestion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM improvement_suggestions
             WHERE prompt_id = $1
             ORDER BY sort_order ASC, created_at ASC"
        );
        sqlx::query_as::<_, ImprovementSuggestion>(&query)
            .bind(prompt_id)
            .fetch_all(pool)
            .await
    }
}

/// Delete-and-insert on an open transaction so readers never see a mix of
/// old and new rows.
pub(crate) async fn replace_in_tx(
    conn: &mut PgConnection,
    prompt_id: DbId,
    suggestions: &[Suggestion],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM improvement_suggestions WHERE prompt_id = $1")
        .bind(prompt_id)
        .execute(&mut *conn)
        .await?;

    for (index, suggestion) in suggestions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO improvement_suggestions
                (prompt_id, section, priority, suggestion_text, sort_order)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(prompt_id)
        .bind(&suggestion.section)
        .bind(suggestion.priority.as_str())
        .bind(&suggestion.text)
        .bind(index as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
