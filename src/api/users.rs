//! User API endpoints
//!
//! - GET /api/users/{id} - public profile with live stats
//! - GET /api/users/{id}/posts - a user's posts (?public=true hides anonymous)
//! - PUT /api/users/me - profile update
//! - PUT /api/users/me/password - password change
//! - GET /api/users/me/saved - the caller's saved posts

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PostResponse, SuccessResponse, UserResponse};
use crate::models::UpdateProfileInput;

/// Query parameters for a user's post listing
#[derive(Debug, Deserialize)]
pub struct UserPostsParams {
    /// "true" restricts the listing to non-anonymous posts
    pub public: Option<String>,
}

/// Request body for a profile update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

/// Request body for a password change
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Build public user routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_user))
        .route("/{id}/posts", get(get_user_posts))
}

/// Build protected user routes (require auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_profile))
        .route("/me/password", put(change_password))
        .route("/me/saved", get(get_saved_posts))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get_user(&id).await?;
    let stats = state.stats_service.author_stats(&user.id).await?;

    Ok(Json(UserResponse::from_user_with_stats(user, stats)))
}

/// GET /api/users/{id}/posts
async fn get_user_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UserPostsParams>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let public_view = params.public.as_deref() == Some("true");
    let posts = state.post_service.list_by_author(&id, public_view).await?;

    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// PUT /api/users/me
async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let input = UpdateProfileInput {
        name: body.name,
        bio: body.bio,
        profile_pic: body.profile_pic,
    };

    let updated = state.user_service.update_profile(&user.id, input).await?;
    let stats = state.stats_service.author_stats(&updated.id).await?;

    Ok(Json(UserResponse::from_user_with_stats(updated, stats)))
}

/// PUT /api/users/me/password
async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .user_service
        .change_password(&user.id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(SuccessResponse::with_message(
        "Password updated successfully.",
    )))
}

/// GET /api/users/me/saved
async fn get_saved_posts(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.post_service.list_saved(&user).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}
