use axum::routing::get;
use axum::Router;

use crate::handlers::favorites;
use crate::state::AppState;

/// Favorites of the calling user, mounted at `/favorites`.
///
/// ```text
/// GET    /                   -> list_favorites
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(favorites::list_favorites))
}
