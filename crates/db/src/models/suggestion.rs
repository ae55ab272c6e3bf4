//! Improvement suggestion model.

use promptlab_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `improvement_suggestions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImprovementSuggestion {
    pub id: DbId,
    pub prompt_id: DbId,
    pub section: String,
    pub priority: String,
    pub suggestion_text: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
}
