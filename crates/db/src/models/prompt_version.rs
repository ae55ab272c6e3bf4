//! Prompt version snapshot model.

use promptlab_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `prompt_versions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: DbId,
    pub prompt_id: DbId,
    pub version_number: i32,
    pub prompt_text: String,
    pub score: i32,
    pub created_at: Timestamp,
}
