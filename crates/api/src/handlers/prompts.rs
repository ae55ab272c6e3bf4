//! Handlers for prompts: the revision flows, reads, metadata and status polling.
//!
//! Revision endpoints answer as soon as the prompt and version rows are
//! written; evaluation and sample output arrive in the background and are
//! observed through `GET /prompts/{id}/status`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use promptlab_core::error::CoreError;
use promptlab_core::revision::{validate_description, validate_title};
use promptlab_core::types::DbId;
use promptlab_db::models::evaluation::PromptEvaluation;
use promptlab_db::models::output::PromptOutput;
use promptlab_db::models::prompt::{Prompt, UpdatePromptMetadata};
use promptlab_db::models::prompt_version::PromptVersion;
use promptlab_db::models::suggestion::ImprovementSuggestion;
use promptlab_db::repositories::{
    EvaluationRepo, FavoriteRepo, OutputRepo, PromptRepo, PromptVersionRepo, SuggestionRepo,
};
use promptlab_pipeline::revision::{CopyRevision, CreateRevision, ForkRevision, VersionRevision};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListPromptsParams {
    pub industry: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    /// 0-based poll attempt, used for backoff and stall detection.
    #[serde(default)]
    pub attempt: u32,
}

/// Everything known about one prompt.
#[derive(Debug, Serialize)]
pub struct PromptRecord {
    pub prompt: Prompt,
    pub versions: Vec<PromptVersion>,
    pub evaluation: Option<PromptEvaluation>,
    pub output: Option<PromptOutput>,
    pub suggestions: Vec<ImprovementSuggestion>,
    /// Whether the caller has favorited it; always false for anonymous callers.
    pub favorited: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a prompt the caller may see. Private prompts of other users read as
/// missing.
async fn load_visible(state: &AppState, id: DbId, user: Option<DbId>) -> AppResult<Prompt> {
    match PromptRepo::find_by_id(&state.pool, id).await? {
        Some(prompt) if prompt.is_visible_to(user) => Ok(prompt),
        _ => Err(AppError::Core(CoreError::prompt_not_found(id))),
    }
}

async fn load_owned(state: &AppState, id: DbId, user: DbId) -> AppResult<Prompt> {
    let prompt = load_visible(state, id, Some(user)).await?;
    if !prompt.is_owned_by(Some(user)) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can modify this prompt".into(),
        )));
    }
    Ok(prompt)
}

// ---------------------------------------------------------------------------
// Revision flows
// ---------------------------------------------------------------------------

/// POST /api/v1/prompts
///
/// Create a prompt from intent (`mode = "create"`) or verbatim text
/// (`mode = "evaluate"`). Anonymous callers create unowned prompts.
pub async fn create_prompt(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateRevision>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.revisions.create(auth.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/prompts/{id}/fork
///
/// Fork and optionally improve a prompt. Unchanged forks copy the source's
/// results instead of re-processing.
pub async fn fork_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ForkRevision>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.revisions.fork(auth.user_id, id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/prompts/{id}/versions
///
/// Owner only. Replaces the text with the next version and re-processes it.
pub async fn create_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<VersionRevision>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.revisions.new_version(auth.user_id, id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/prompts/{id}/copy
///
/// Private copy with the source's results. The body is optional.
pub async fn copy_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    input: Option<Json<CopyRevision>>,
) -> AppResult<impl IntoResponse> {
    let input = input.map(|Json(c)| c).unwrap_or_default();
    let outcome = state.revisions.copy(auth.user_id, id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/prompts/{id}/reprocess
///
/// Owner only. Re-run evaluation and output for the current text.
pub async fn reprocess_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.revisions.reprocess(auth.user_id, id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: outcome })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/prompts
///
/// Public prompts, newest first. Optional `?industry=` filter.
pub async fn list_prompts(
    State(state): State<AppState>,
    Query(params): Query<ListPromptsParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let prompts =
        PromptRepo::list_public(&state.pool, params.industry.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse { data: prompts }))
}

/// GET /api/v1/prompts/mine
pub async fn list_my_prompts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.resolve();
    let prompts = PromptRepo::list_by_owner(&state.pool, auth.user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: prompts }))
}

/// GET /api/v1/prompts/{id}
///
/// Full record: prompt, versions (oldest first), evaluation, output and
/// suggestions. Counts an impression.
pub async fn get_prompt(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = auth.user_id();
    load_visible(&state, id, user).await?;
    PromptRepo::increment_impressions(&state.pool, id).await?;

    let prompt = PromptRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::prompt_not_found(id)))?;
    let versions = PromptVersionRepo::list_for_prompt(&state.pool, id).await?;
    let evaluation = EvaluationRepo::find_for_prompt(&state.pool, id).await?;
    let output = OutputRepo::find_for_prompt(&state.pool, id).await?;
    let suggestions = SuggestionRepo::list_for_prompt(&state.pool, id).await?;
    let favorited = match user {
        Some(user_id) => FavoriteRepo::exists(&state.pool, user_id, id).await?,
        None => false,
    };

    Ok(Json(DataResponse {
        data: PromptRecord {
            prompt,
            versions,
            evaluation,
            output,
            suggestions,
            favorited,
        },
    }))
}

/// GET /api/v1/prompts/{id}/versions
pub async fn list_versions(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_visible(&state, id, auth.user_id()).await?;
    let versions = PromptVersionRepo::list_for_prompt(&state.pool, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// GET /api/v1/prompts/{id}/status?attempt=n
///
/// Readiness of evaluation and output, with the recommended next poll delay
/// and a stall classification once the poll budget is spent.
pub async fn get_status(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<StatusParams>,
) -> AppResult<impl IntoResponse> {
    load_visible(&state, id, auth.user_id()).await?;
    let report = state.status.report(id, params.attempt).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Metadata and deletion
// ---------------------------------------------------------------------------

/// PATCH /api/v1/prompts/{id}
///
/// Owner only. Title, description, industry and visibility; text changes go
/// through `POST /prompts/{id}/versions`.
pub async fn update_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePromptMetadata>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, auth.user_id).await?;
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(description) = &input.description {
        validate_description(description)?;
    }

    let prompt = PromptRepo::update_metadata(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::prompt_not_found(id)))?;

    tracing::info!(prompt_id = %id, user_id = %auth.user_id, "Prompt metadata updated");

    Ok(Json(DataResponse { data: prompt }))
}

/// DELETE /api/v1/prompts/{id}
///
/// Owner only. Cascades to versions, results and favorites.
pub async fn delete_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, id, auth.user_id).await?;

    if !PromptRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::prompt_not_found(id)));
    }

    tracing::info!(prompt_id = %id, user_id = %auth.user_id, "Prompt deleted");

    Ok(StatusCode::NO_CONTENT)
}
