//! # REST API for Stories
//!
//! Story creation from a redeemed code, owner edits, the favorites shelf
//! and the moderation endpoints for platform administrators.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use tracing::info;

use crate::backend::io::rest::auth::CurrentUser;
use crate::backend::io::rest::error::ApiError;
use crate::backend::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::io::rest::mappers::story_mapper::StoryMapper;
use crate::backend::AppState;
use shared::{
    AdminStoryListQuery, ChangeModerationStateRequest, CreateStoryRequest, DetailResponse,
    StoryListResponse, StoryResponse, UpdateStoryRequest,
};

/// Create a router for story related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_story))
        .route("/me", get(list_my_stories))
        .route("/admin", get(list_stories_by_state))
        .route("/admin/:id", patch(change_moderation_state))
        .route("/organization/:organization_id", get(list_organization_stories))
        .route("/favorites/:organization_id", get(get_favorites))
        .route("/:id", get(get_story).patch(update_story).delete(delete_story))
        .route("/:id/position/:position", patch(set_position))
}

/// Create a story, consuming a code of the caller
pub async fn create_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "POST /api/stories by user {} (goal {:?}, organization {:?})",
        user.id, request.goal_id, request.organization_id
    );

    let command = StoryMapper::to_create_command(request)?;
    let story = state.story_service.create_story(command, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoryResponse {
            detail: "Story created and sent to moderation".to_string(),
            story: StoryMapper::to_dto(story),
        }),
    ))
}

pub async fn get_story(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/stories/{}", id);
    let story = state.story_service.get_story(id).await?;
    Ok(Json(StoryMapper::to_dto(story)))
}

/// Owner edit
pub async fn update_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("PATCH /api/stories/{} by user {}", id, user.id);

    let command = StoryMapper::to_update_command(request)?;
    let story = state.story_service.update_story(id, command, &user).await?;
    Ok(Json(StoryResponse {
        detail: "Story updated".to_string(),
        story: StoryMapper::to_dto(story),
    }))
}

pub async fn delete_story(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("DELETE /api/stories/{} by user {}", id, user.id);
    state.story_service.delete_story(id, &user).await?;
    Ok(Json(DetailResponse::new("Story deleted")))
}

pub async fn list_organization_stories(
    State(state): State<AppState>,
    ApiPath(organization_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/stories/organization/{}", organization_id);
    let stories = state.story_service.list_by_organization(organization_id).await?;
    Ok(Json(StoryListResponse {
        stories: StoryMapper::to_dto_list(stories),
    }))
}

pub async fn list_my_stories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/stories/me by user {}", user.id);
    let stories = state.story_service.list_by_owner(user.id).await?;
    Ok(Json(StoryListResponse {
        stories: StoryMapper::to_dto_list(stories),
    }))
}

/// Place a story on the favorites shelf of its organization
pub async fn set_position(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, position)): ApiPath<(i64, u8)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("PATCH /api/stories/{}/position/{} by user {}", id, position, user.id);
    let story = state.story_service.set_position(id, position, &user).await?;
    Ok(Json(StoryResponse {
        detail: "Story position updated".to_string(),
        story: StoryMapper::to_dto(story),
    }))
}

pub async fn get_favorites(
    State(state): State<AppState>,
    ApiPath(organization_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/stories/favorites/{}", organization_id);
    let shelf = state.story_service.favorites(organization_id).await?;
    Ok(Json(StoryMapper::to_favorites(shelf)))
}

/// Moderation queue
pub async fn list_stories_by_state(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<AdminStoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!("GET /api/stories/admin?moderation_state={} by user {}", query.moderation_state, user.id);
    let stories = state.story_service.list_by_state(query.moderation_state, &user).await?;
    Ok(Json(StoryListResponse {
        stories: StoryMapper::to_dto_list(stories),
    }))
}

pub async fn change_moderation_state(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ChangeModerationStateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("PATCH /api/stories/admin/{} -> {} by user {}", id, request.moderation_state, user.id);
    let story = state
        .moderation_service
        .change_moderation_state(id, request.moderation_state, &user)
        .await?;
    Ok(Json(StoryResponse {
        detail: format!("Story moved to {}", story.moderation_state),
        story: StoryMapper::to_dto(story),
    }))
}
