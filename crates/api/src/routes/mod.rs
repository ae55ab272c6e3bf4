pub mod favorites;
pub mod health;
pub mod prompts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree, except the rewrite routes in
/// [`improve_routes`].
///
/// ```text
/// /prompts                              create (POST), list public (GET)
/// /prompts/mine                         list own (auth)
/// /prompts/{id}                         full record, update metadata, delete
/// /prompts/{id}/status                  readiness poll (?attempt=n)
/// /prompts/{id}/fork                    fork / improve (auth)
/// /prompts/{id}/versions                list (GET), new version (POST, owner)
/// /prompts/{id}/copy                    private copy (auth)
/// /prompts/{id}/reprocess               re-run the pipeline (owner)
/// /prompts/{id}/favorite                add (POST), remove (DELETE)
///
/// /favorites                            list favorites (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/prompts", prompts::router())
        .nest("/favorites", favorites::router())
}

/// Fork and new-version routes, mounted next to [`api_routes`] with their
/// own timeout.
pub fn improve_routes() -> Router<AppState> {
    Router::new().nest("/prompts", prompts::improve_router())
}
