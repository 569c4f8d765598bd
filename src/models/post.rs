//! Post model
//!
//! This module provides:
//! - `Post` entity with its frozen author snapshot and rating tally
//! - `PostBasis` enum for the claimed justification of a post
//! - Input and query types for creating, editing, and listing posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity.
///
/// `author_name`, `author_avg_rating`, and `author_post_count` are a
/// denormalized snapshot of the author's statistics captured when the post
/// was created. They are intentionally never updated afterwards, even when
/// the author's live statistics change.
///
/// `rating_count` and `rating_sum` are aggregated from the ratings table on
/// every read; they are not stored on the post row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier (opaque string)
    pub id: String,
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Category name reference
    pub category: String,
    /// Claimed basis of the post
    pub basis: PostBasis,
    /// Ordered list of tags (no duplicates)
    pub tags: Vec<String>,
    /// Author user id
    pub author_id: String,
    /// Whether the author's name is hidden from readers
    pub anonymous: bool,
    /// Author display name at creation time
    pub author_name: String,
    /// Author average rating at creation time (frozen)
    pub author_avg_rating: f64,
    /// Author post count at creation time, excluding this post (frozen)
    pub author_post_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Number of ratings currently on the post (aggregated on read)
    #[serde(default)]
    pub rating_count: i64,
    /// Sum of rating values currently on the post (aggregated on read)
    #[serde(default)]
    pub rating_sum: i64,
}

impl Post {
    /// Create a new post with the author's snapshot fields already computed
    pub fn new(
        input: CreatePostInput,
        author_id: String,
        author_name: String,
        author_avg_rating: f64,
        author_post_count: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            category: input.category,
            basis: input.basis,
            tags: input.tags,
            author_id,
            anonymous: input.anonymous,
            author_name,
            author_avg_rating,
            author_post_count,
            created_at: Utc::now(),
            rating_count: 0,
            rating_sum: 0,
        }
    }

    /// The post's current rating tally
    pub fn tally(&self) -> RatingTally {
        RatingTally {
            count: self.rating_count,
            sum: self.rating_sum,
        }
    }
}

/// Aggregated ratings of a single post: how many ratings it has and their sum.
///
/// The mean is always derived from these two numbers rather than stored, so
/// it is invariant under any ordering of the underlying rating entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingTally {
    /// Number of ratings
    pub count: i64,
    /// Sum of rating values
    pub sum: i64,
}

/// The claimed justification behind a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostBasis {
    /// Personal experience
    Personal,
    /// Professional knowledge
    Professional,
    /// A researched source
    Researched,
    /// Opinion or perspective
    Opinion,
    /// Something else
    Other,
}

impl PostBasis {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostBasis::Personal => "personal",
            PostBasis::Professional => "professional",
            PostBasis::Researched => "researched",
            PostBasis::Opinion => "opinion",
            PostBasis::Other => "other",
        }
    }

    /// Parse from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "personal" => Some(PostBasis::Personal),
            "professional" => Some(PostBasis::Professional),
            "researched" => Some(PostBasis::Researched),
            "opinion" => Some(PostBasis::Opinion),
            "other" => Some(PostBasis::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Category name reference
    pub category: String,
    /// Claimed basis
    pub basis: PostBasis,
    /// Tags
    pub tags: Vec<String>,
    /// Hide the author's name from readers
    pub anonymous: bool,
}

/// Input for an admin post edit; unset fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    /// New title (optional)
    pub title: Option<String>,
    /// New content (optional)
    pub content: Option<String>,
    /// New category name (optional)
    pub category: Option<String>,
    /// New basis (optional)
    pub basis: Option<PostBasis>,
    /// New tag list (optional)
    pub tags: Option<Vec<String>>,
    /// New anonymity flag (optional)
    pub anonymous: Option<bool>,
}

impl UpdatePostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.category.is_some()
            || self.basis.is_some()
            || self.tags.is_some()
            || self.anonymous.is_some()
    }
}

/// Sort order for post listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    /// Newest first (default)
    #[default]
    Newest,
    /// Oldest first
    Oldest,
}

/// Query parameters for listing posts
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Keyword searched across title, content, tags, and author name
    pub search: Option<String>,
    /// Filter by category name
    pub category: Option<String>,
    /// Filter by exact tag
    pub tag: Option<String>,
    /// Sort order
    pub sort: PostSort,
    /// Maximum number of posts to return
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> CreatePostInput {
        CreatePostInput {
            title: "Why I left the city".to_string(),
            content: "It was loud.".to_string(),
            category: "Life".to_string(),
            basis: PostBasis::Personal,
            tags: vec!["city".to_string(), "quiet".to_string()],
            anonymous: false,
        }
    }

    #[test]
    fn test_post_new_freezes_snapshot() {
        let post = Post::new(
            sample_input(),
            "author-1".to_string(),
            "Alice".to_string(),
            4.5,
            3,
        );

        assert!(!post.id.is_empty());
        assert_eq!(post.author_name, "Alice");
        assert_eq!(post.author_avg_rating, 4.5);
        assert_eq!(post.author_post_count, 3);
        assert_eq!(post.rating_count, 0);
        assert_eq!(post.rating_sum, 0);
    }

    #[test]
    fn test_tally() {
        let mut post = Post::new(sample_input(), "a".into(), "A".into(), 0.0, 0);
        post.rating_count = 2;
        post.rating_sum = 9;
        assert_eq!(post.tally(), RatingTally { count: 2, sum: 9 });
    }

    #[test]
    fn test_basis_roundtrip() {
        for basis in [
            PostBasis::Personal,
            PostBasis::Professional,
            PostBasis::Researched,
            PostBasis::Opinion,
            PostBasis::Other,
        ] {
            assert_eq!(PostBasis::from_str(basis.as_str()), Some(basis));
        }
        assert_eq!(PostBasis::from_str("OPINION"), Some(PostBasis::Opinion));
        assert_eq!(PostBasis::from_str("hearsay"), None);
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdatePostInput::default().has_changes());

        let update = UpdatePostInput {
            anonymous: Some(true),
            ..Default::default()
        };
        assert!(update.has_changes());
    }
}
