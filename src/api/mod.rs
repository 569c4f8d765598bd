//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints of the Unmute World backend:
//! - Auth endpoints (signup, login, password reset)
//! - Post endpoints (listing, creation, ratings, saved set)
//! - User endpoints (profiles, self-service updates)
//! - Category endpoints
//! - Admin endpoints (stats, moderation)

pub mod admin;
pub mod auth;
pub mod categories;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::post,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need auth + admin privilege)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route("/categories", post(categories::create_category))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/posts", posts::protected_router())
        .nest("/users", users::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/posts", posts::public_router())
        .nest("/users", users::public_router())
        .nest("/categories", categories::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
