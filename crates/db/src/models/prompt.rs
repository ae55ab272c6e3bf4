//! Prompt models and DTOs.

use promptlab_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `prompts` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Prompt {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub prompt_text: String,
    pub is_public: bool,
    pub owner_id: Option<DbId>,
    /// Aggregate score, 0 until the first evaluation lands.
    pub score: i32,
    pub impressions: i64,
    /// Version number of the latest revision.
    pub generation: i32,
    pub forked_from_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Prompt {
    /// Whether `user_id` owns this prompt. Anonymous prompts have no owner.
    pub fn is_owned_by(&self, user_id: Option<DbId>) -> bool {
        matches!((self.owner_id, user_id), (Some(owner), Some(user)) if owner == user)
    }

    /// Private prompts are visible to their owner only.
    pub fn is_visible_to(&self, user_id: Option<DbId>) -> bool {
        self.is_public || self.owner_id.is_none() || self.is_owned_by(user_id)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a prompt together with its first version.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrompt {
    pub title: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub prompt_text: String,
    pub is_public: bool,
    pub owner_id: Option<DbId>,
    /// Initial aggregate score (0 for new prompts, the source's score for clones).
    pub score: i32,
    pub forked_from_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Metadata patch. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePromptMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub is_public: Option<bool>,
}
