//! Revision request validation and the decisions the revision flows make
//! before touching storage.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum prompt body length in characters.
pub const MAX_PROMPT_LENGTH: usize = 20_000;

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2_000;

/// Maximum length of free-text improvement notes.
pub const MAX_NOTES_LENGTH: usize = 2_000;

/// Maximum number of applied suggestions accepted in one improvement request.
pub const MAX_APPLIED_SUGGESTIONS: usize = 20;

/// Version number of the first snapshot of every prompt.
pub const FIRST_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// Request kinds
// ---------------------------------------------------------------------------

/// How the body of a newly created prompt is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateMode {
    /// Transform free-form intent through the classifier templates.
    Create,
    /// Use the caller's text verbatim.
    #[default]
    Evaluate,
}

/// What a caller asked for when acting on an existing prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkAction {
    #[default]
    Fork,
    Version,
}

/// The four revision flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Create,
    Fork,
    Version,
    Copy,
}

/// Facts used to decide whether a fork can skip re-processing.
#[derive(Debug, Clone, Copy)]
pub struct ForkFacts<'a> {
    pub is_owner: bool,
    pub action: ForkAction,
    pub improve: bool,
    pub notes: Option<&'a str>,
    pub applied_suggestions: &'a [String],
    pub original_text: &'a str,
    pub new_text: &'a str,
    /// `Some(false)` turns the simple-copy path off. It never turns it on:
    /// the trimmed texts must still match.
    pub no_changes: Option<bool>,
}

/// A fork is a simple copy when a non-owner forks without any improvement
/// intent and the trimmed text is unchanged.
pub fn is_simple_copy(facts: &ForkFacts<'_>) -> bool {
    let no_intent = !facts.improve
        && facts.notes.map_or(true, |n| n.trim().is_empty())
        && facts.applied_suggestions.is_empty();

    if facts.is_owner || facts.action != ForkAction::Fork || !no_intent {
        return false;
    }

    facts.no_changes != Some(false) && facts.original_text.trim() == facts.new_text.trim()
}

/// Resolve the action actually performed: only the owner may create a new
/// version; anyone else asking for one gets a fork.
pub fn effective_action(requested: ForkAction, is_owner: bool) -> ForkAction {
    match requested {
        ForkAction::Version if is_owner => ForkAction::Version,
        _ => ForkAction::Fork,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Prompt text must be non-blank and within the length limit.
pub fn validate_prompt_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(
            "Prompt text must not be empty".to_string(),
        ));
    }
    let len = text.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt text exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Title must be non-blank and within the length limit.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title exceeds maximum length of {MAX_TITLE_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Description: length check only (can be empty).
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Improvement notes and applied suggestions: length and count checks.
pub fn validate_improvement_input(
    notes: Option<&str>,
    applied_suggestions: &[String],
) -> Result<(), CoreError> {
    if let Some(notes) = notes {
        let len = notes.chars().count();
        if len > MAX_NOTES_LENGTH {
            return Err(CoreError::Validation(format!(
                "Improvement notes exceed maximum length of {MAX_NOTES_LENGTH} characters (got {len})"
            )));
        }
    }
    if applied_suggestions.len() > MAX_APPLIED_SUGGESTIONS {
        return Err(CoreError::Validation(format!(
            "At most {MAX_APPLIED_SUGGESTIONS} suggestions can be applied at once (got {})",
            applied_suggestions.len()
        )));
    }
    Ok(())
}

/// Derive a title from the first non-empty line of the prompt text.
pub fn derive_title(text: &str) -> String {
    let line = text
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .unwrap_or("Untitled prompt");
    line.chars().take(80).collect()
}

/// Title for a fork or copy of another prompt.
pub fn derived_copy_title(original: &str, kind: RevisionKind) -> String {
    let title = match kind {
        RevisionKind::Copy => format!("Copy of {original}"),
        _ => format!("{original} (fork)"),
    };
    title.chars().take(MAX_TITLE_LENGTH).collect()
}

/// Rewrite guard: publish the rewrite only when it scores at least as well.
pub fn accept_rewrite(original_score: i32, rewritten_score: i32) -> bool {
    rewritten_score >= original_score
}
