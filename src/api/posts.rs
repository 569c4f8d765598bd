//! Post API endpoints
//!
//! - GET    /api/posts - list with search/filter/sort/limit
//! - POST   /api/posts - create (authenticated, non-blocked)
//! - GET    /api/posts/{id} - single post
//! - POST   /api/posts/{id}/rate - submit or replace a rating
//! - POST   /api/posts/{id}/save - add to the saved set
//! - DELETE /api/posts/{id}/save - remove from the saved set
//! - GET    /api/posts/{id}/issaved - membership check

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PostResponse, SuccessResponse};
use crate::models::{CreatePostInput, PostBasis, PostQuery, PostSort};

/// Query parameters for the post listing
#[derive(Debug, Deserialize)]
pub struct ListPostsParams {
    /// Search keyword (title, content, tags, author name)
    pub q: Option<String>,
    /// Filter by category name
    pub category: Option<String>,
    /// Filter by exact tag
    pub tag: Option<String>,
    /// "newest" (default) or "oldest"
    pub sort: Option<String>,
    /// Maximum number of posts
    pub limit: Option<i64>,
}

impl From<ListPostsParams> for PostQuery {
    fn from(params: ListPostsParams) -> Self {
        let sort = match params.sort.as_deref() {
            Some("oldest") => PostSort::Oldest,
            _ => PostSort::Newest,
        };

        PostQuery {
            search: params.q.filter(|q| !q.trim().is_empty()),
            category: params.category,
            tag: params.tag,
            sort,
            limit: params.limit.filter(|limit| *limit > 0),
        }
    }
}

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub category: String,
    pub basis: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub anonymous: bool,
}

/// Request body for rating a post
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i32,
}

/// Response for the saved-membership check
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsSavedResponse {
    pub is_saved: bool,
}

/// Build public post routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{id}", get(get_post))
}

/// Build protected post routes (require auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/{id}/rate", post(rate_post))
        .route("/{id}/save", post(save_post))
        .route("/{id}/save", delete(unsave_post))
        .route("/{id}/issaved", get(is_saved))
}

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let query = PostQuery::from(params);
    let posts = state.post_service.list_posts(&query).await?;

    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let basis = PostBasis::from_str(&body.basis)
        .ok_or_else(|| ApiError::validation_error(format!("Invalid basis: {}", body.basis)))?;

    let input = CreatePostInput {
        title: body.title,
        content: body.content,
        category: body.category,
        basis,
        tags: body.tags,
        anonymous: body.anonymous,
    };

    let created = state.post_service.create_post(&user, input).await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(created))))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_post(&id).await?;
    Ok(Json(PostResponse::from(post)))
}

/// POST /api/posts/{id}/rate
async fn rate_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<RateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.post_service.rate_post(&id, &user, body.rating).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_message("Rating submitted")),
    ))
}

/// POST /api/posts/{id}/save
async fn save_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.post_service.save_post(&user, &id).await?;
    Ok(Json(SuccessResponse::new()))
}

/// DELETE /api/posts/{id}/save
async fn unsave_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.post_service.unsave_post(&user, &id).await?;
    Ok(Json(SuccessResponse::new()))
}

/// GET /api/posts/{id}/issaved
async fn is_saved(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<IsSavedResponse>, ApiError> {
    let is_saved = state.post_service.is_saved(&user, &id).await?;
    Ok(Json(IsSavedResponse { is_saved }))
}
