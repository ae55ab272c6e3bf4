//! Handlers for user favorites. All endpoints require authentication.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use promptlab_core::error::CoreError;
use promptlab_core::types::DbId;
use promptlab_db::repositories::{FavoriteRepo, PromptRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub prompt_id: DbId,
    pub favorited: bool,
}

/// POST /api/v1/prompts/{id}/favorite
///
/// Idempotent: favoriting twice returns 200 instead of 201.
pub async fn add_favorite(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(prompt_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let visible = PromptRepo::find_by_id(&state.pool, prompt_id)
        .await?
        .is_some_and(|p| p.is_visible_to(Some(auth.user_id)));
    if !visible {
        return Err(AppError::Core(CoreError::prompt_not_found(prompt_id)));
    }

    let created = FavoriteRepo::add(&state.pool, auth.user_id, prompt_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(DataResponse {
            data: FavoriteState {
                prompt_id,
                favorited: true,
            },
        }),
    ))
}

/// DELETE /api/v1/prompts/{id}/favorite
pub async fn remove_favorite(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(prompt_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    FavoriteRepo::remove(&state.pool, auth.user_id, prompt_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/favorites
///
/// Favorited prompts the caller can still see, most recently favorited first.
pub async fn list_favorites(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.resolve();
    let prompts =
        FavoriteRepo::list_prompts_for_user(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: prompts }))
}
