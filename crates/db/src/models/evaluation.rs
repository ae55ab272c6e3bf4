//! Prompt evaluation model.

use promptlab_core::scoring::{FeedbackItem, SubScores};
use promptlab_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// `source` value of the zeroed row written while a new version is processed.
pub const SOURCE_PLACEHOLDER: &str = "placeholder";

/// A row from the `prompt_evaluations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptEvaluation {
    pub id: DbId,
    pub prompt_id: DbId,
    pub clarity_score: i32,
    pub specificity_score: i32,
    pub contextual_score: i32,
    pub effectiveness_score: i32,
    pub feedback: Json<Vec<FeedbackItem>>,
    pub source: String,
    pub generation: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PromptEvaluation {
    pub fn sub_scores(&self) -> SubScores {
        SubScores {
            clarity: self.clarity_score,
            specificity: self.specificity_score,
            contextual: self.contextual_score,
            effectiveness: self.effectiveness_score,
        }
    }
}
