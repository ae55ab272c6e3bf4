//! Route definitions for prompts, mounted at `/prompts`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{favorites, prompts};
use crate::state::AppState;

/// ```text
/// GET    /                   -> list_prompts
/// POST   /                   -> create_prompt
/// GET    /mine               -> list_my_prompts
/// GET    /{id}               -> get_prompt
/// PATCH  /{id}               -> update_prompt
/// DELETE /{id}               -> delete_prompt
/// GET    /{id}/status        -> get_status
/// GET    /{id}/versions      -> list_versions
/// POST   /{id}/copy          -> copy_prompt
/// POST   /{id}/reprocess     -> reprocess_prompt
/// POST   /{id}/favorite      -> add_favorite
/// DELETE /{id}/favorite      -> remove_favorite
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(prompts::list_prompts).post(prompts::create_prompt))
        .route("/mine", get(prompts::list_my_prompts))
        .route(
            "/{id}",
            get(prompts::get_prompt)
                .patch(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route("/{id}/status", get(prompts::get_status))
        .route("/{id}/versions", get(prompts::list_versions))
        .route("/{id}/copy", post(prompts::copy_prompt))
        .route("/{id}/reprocess", post(prompts::reprocess_prompt))
        .route(
            "/{id}/favorite",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
}

/// Routes that may run an LLM rewrite before responding. Served under their
/// own, longer request timeout.
///
/// ```text
/// POST   /{id}/fork          -> fork_prompt
/// POST   /{id}/versions      -> create_version
/// ```
pub fn improve_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/fork", post(prompts::fork_prompt))
        .route("/{id}/versions", post(prompts::create_version))
}
