//! Shared API response types
//!
//! JSON shapes returned to the SPA, in camelCase. Post responses never
//! expose the raw ratings collection (only the derived mean and count), and
//! anonymous posts mask the author's name. User responses strip the password
//! hash, the saved-posts set, and the reset-token fields.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Post, User};
use crate::services::stats::{post_rating, AuthorStats, CategoryCount, PlatformStats};

/// Name shown instead of the author's on anonymous posts
pub const ANONYMOUS_AUTHOR_NAME: &str = "Anonymous";

// ============================================================================
// Post response types
// ============================================================================

/// Full post response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub basis: String,
    pub tags: Vec<String>,
    pub anonymous: bool,
    pub author_id: String,
    pub author_name: String,
    pub author_avg_rating: f64,
    pub author_post_count: i64,
    pub post_rating: f64,
    pub rating_count: i64,
    pub created_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        let tally = post.tally();
        let author_name = if post.anonymous {
            ANONYMOUS_AUTHOR_NAME.to_string()
        } else {
            post.author_name
        };

        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            category: post.category,
            basis: post.basis.to_string(),
            tags: post.tags,
            anonymous: post.anonymous,
            author_id: post.author_id,
            author_name,
            author_avg_rating: post.author_avg_rating,
            author_post_count: post.author_post_count,
            post_rating: post_rating(&tally),
            rating_count: tally.count,
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// User response types
// ============================================================================

/// User response with live statistics attached
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_pic: String,
    pub bio: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub join_date: String,
    pub post_count: i64,
    pub avg_rating: f64,
}

impl UserResponse {
    /// Build a response from a user and their freshly computed statistics
    pub fn from_user_with_stats(user: User, stats: AuthorStats) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            profile_pic: user.profile_pic,
            bio: user.bio,
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            join_date: user.created_at.to_rfc3339(),
            post_count: stats.post_count,
            avg_rating: stats.avg_rating,
        }
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

// ============================================================================
// Category response types
// ============================================================================

/// Category response
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            color: category.color,
        }
    }
}

// ============================================================================
// Admin stats response
// ============================================================================

/// Platform statistics payload for the admin dashboard
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_posts: i64,
    pub anonymous_posts: i64,
    pub avg_platform_rating: f64,
    pub category_popularity: Vec<CategoryCount>,
}

impl From<PlatformStats> for StatsResponse {
    fn from(stats: PlatformStats) -> Self {
        Self {
            total_users: stats.total_users,
            total_posts: stats.total_posts,
            anonymous_posts: stats.anonymous_posts,
            avg_platform_rating: stats.avg_platform_rating,
            category_popularity: stats.category_popularity,
        }
    }
}

/// Generic success acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn new() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self::new()
    }
}
