//! Admin API endpoints
//!
//! All routes require an authenticated admin:
//! - GET    /api/admin/stats - platform statistics
//! - GET    /api/admin/users - all users
//! - POST   /api/admin/users/{id}/toggle-block - flip the blocked flag
//! - DELETE /api/admin/users/{id} - delete a user with full cascade
//! - GET    /api/admin/posts - all posts
//! - PUT    /api/admin/posts/{id} - edit any post field
//! - DELETE /api/admin/posts/{id} - delete a post with saved-set sweep
//! - DELETE /api/admin/categories/{id} - delete an unused category

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PostResponse, StatsResponse, SuccessResponse, UserResponse};
use crate::models::{PostBasis, PostQuery, UpdatePostInput};

/// Request body for an admin post edit; unset fields are left alone
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub basis: Option<String>,
    pub tags: Option<Vec<String>>,
    pub anonymous: Option<bool>,
}

/// Response for the block toggle
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBlockResponse {
    pub success: bool,
    pub is_blocked: bool,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/users", get(list_users))
        .route("/users/{id}/toggle-block", post(toggle_block))
        .route("/users/{id}", delete(delete_user))
        .route("/posts", get(list_posts))
        .route("/posts/{id}", put(update_post))
        .route("/posts/{id}", delete(delete_post))
        .route("/categories/{id}", delete(delete_category))
}

/// GET /api/admin/stats
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.stats_service.platform_stats().await?;
    Ok(Json(StatsResponse::from(stats)))
}

/// GET /api/admin/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list_users().await?;

    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        let stats = state.stats_service.author_stats(&user.id).await?;
        responses.push(UserResponse::from_user_with_stats(user, stats));
    }

    Ok(Json(responses))
}

/// POST /api/admin/users/{id}/toggle-block
async fn toggle_block(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToggleBlockResponse>, ApiError> {
    let is_blocked = state.user_service.toggle_block(&id).await?;

    Ok(Json(ToggleBlockResponse {
        success: true,
        is_blocked,
    }))
}

/// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.user_service.delete_user(&id).await?;

    Ok(Json(SuccessResponse::with_message(
        "User and all associated data deleted.",
    )))
}

/// GET /api/admin/posts
async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.post_service.list_posts(&PostQuery::default()).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// PUT /api/admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let basis = match body.basis {
        Some(raw) => Some(
            PostBasis::from_str(&raw)
                .ok_or_else(|| ApiError::validation_error(format!("Invalid basis: {}", raw)))?,
        ),
        None => None,
    };

    let input = UpdatePostInput {
        title: body.title,
        content: body.content,
        category: body.category,
        basis,
        tags: body.tags,
        anonymous: body.anonymous,
    };

    let updated = state.post_service.update_post(&id, input).await?;
    Ok(Json(PostResponse::from(updated)))
}

/// DELETE /api/admin/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.post_service.delete_post(&id).await?;

    Ok(Json(SuccessResponse::with_message(
        "Post deleted successfully.",
    )))
}

/// DELETE /api/admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.category_service.delete(&id).await?;
    Ok(Json(SuccessResponse::new()))
}
