//! Prompt sample output model.

use promptlab_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `prompt_outputs` table. `output_text` is blank while a
/// new version is being processed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptOutput {
    pub id: DbId,
    pub prompt_id: DbId,
    pub output_text: Option<String>,
    pub generation: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
