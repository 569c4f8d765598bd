//! Unmute World - a social publishing platform backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unmute::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{
        CategoryService, EmailService, LoginRateLimiter, PostService, StatsService, UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unmute=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Unmute World backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());

    // Initialize services
    let stats_service = Arc::new(StatsService::new(post_repo.clone(), user_repo.clone()));
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        post_repo.clone(),
        session_repo.clone(),
    ));
    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        stats_service.clone(),
    ));
    let category_service = Arc::new(CategoryService::new(
        category_repo,
        post_repo.clone(),
        cache.clone(),
    ));
    let email_service = Arc::new(EmailService::new(config.email.clone()));
    if !email_service.is_configured() {
        tracing::warn!("SMTP is not configured; password-reset mail will be unavailable");
    }

    let rate_limiter = Arc::new(LoginRateLimiter::new());

    // Build application state
    let state = AppState {
        user_service,
        post_service,
        category_service,
        stats_service,
        email_service,
        rate_limiter: rate_limiter.clone(),
        frontend_url: config.server.frontend_url.clone(),
    };

    // Expired sessions and stale rate-limit entries are swept every 5 minutes
    {
        let limiter = rate_limiter.clone();
        let session_repo = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                if let Err(e) = session_repo.delete_expired().await {
                    tracing::warn!("Failed to sweep expired sessions: {}", e);
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
