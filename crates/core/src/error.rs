//! Domain error type shared by every crate in the workspace.

use crate::types::DbId;

/// Errors raised by domain logic, independent of transport.
///
/// The API layer maps each variant onto an HTTP status; the pipeline layer
/// wraps it alongside database and LLM errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced prompt (or dependent record) does not exist.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Missing or malformed input. Reported to the caller, never logged as a fault.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but does not own the prompt.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing prompt.
    pub fn prompt_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Prompt",
            id,
        }
    }
}
