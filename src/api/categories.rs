//! Category API endpoints
//!
//! - GET  /api/categories - list all categories
//! - POST /api/categories - create (admin only, mounted behind the admin
//!   middleware in the router)

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::CategoryResponse;
use crate::models::CreateCategoryInput;

/// Request body for creating a category
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: String,
    pub color: Option<String>,
}

/// Build public category routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.category_service.list().await?;

    Ok(Json(
        categories.into_iter().map(CategoryResponse::from).collect(),
    ))
}

/// POST /api/categories (admin)
pub async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .category_service
        .create(CreateCategoryInput {
            name: body.name,
            description: body.description,
            color: body.color,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(created))))
}
