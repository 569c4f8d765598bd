//! Post service
//!
//! Business logic for posts:
//! - creation, with the author's statistics snapshot frozen onto the post
//! - rating submission (one rating per rater, no self-rating)
//! - the saved-posts set
//! - admin edit and the post deletion cascade

use crate::db::repositories::{PostRepository, UserRepository};
use crate::models::{CreatePostInput, Post, PostQuery, UpdatePostInput, User};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::stats::StatsService;
use anyhow::Context;
use std::sync::Arc;

/// Lowest accepted rating value
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating value
pub const MAX_RATING: i32 = 5;

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    stats: Arc<StatsService>,
}

impl PostService {
    /// Create a new post service
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        stats: Arc<StatsService>,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            stats,
        }
    }

    /// Create a new post.
    ///
    /// The author's current post count and average rating are computed
    /// BEFORE the insert and stored on the post. The stored values therefore
    /// describe the author at the moment of writing — the new post itself is
    /// not counted, and later rating activity never rewrites them.
    pub async fn create_post(&self, author: &User, input: CreatePostInput) -> ServiceResult<Post> {
        if author.is_blocked {
            return Err(ServiceError::Forbidden(
                "User account is blocked".to_string(),
            ));
        }
        self.validate_create_input(&input)?;

        let snapshot = self.stats.author_stats(&author.id).await?;

        let mut input = input;
        input.tags = normalize_tags(input.tags);

        let post = Post::new(
            input,
            author.id.clone(),
            author.name.clone(),
            snapshot.avg_rating,
            snapshot.post_count,
        );

        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = %created.id, author_id = %author.id, "post created");

        Ok(created)
    }

    /// Get a post by id
    pub async fn get_post(&self, id: &str) -> ServiceResult<Post> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::NotFound("Post not found".to_string()))
    }

    /// List posts with search/filter/sort/limit
    pub async fn list_posts(&self, query: &PostQuery) -> ServiceResult<Vec<Post>> {
        Ok(self
            .post_repo
            .list(query)
            .await
            .context("Failed to list posts")?)
    }

    /// List a user's posts, optionally hiding anonymous ones (public view)
    pub async fn list_by_author(
        &self,
        author_id: &str,
        public_view: bool,
    ) -> ServiceResult<Vec<Post>> {
        Ok(self
            .post_repo
            .list_by_author(author_id, public_view)
            .await
            .context("Failed to list posts by author")?)
    }

    /// Submit a rating on a post.
    ///
    /// A rater's repeated submission replaces their previous value in place;
    /// the rating count does not change. The write is a single atomic upsert,
    /// so concurrent ratings from different raters are all kept.
    ///
    /// # Errors
    /// - `Validation` when the value is outside 1..=5
    /// - `NotFound` when the post doesn't exist
    /// - `SelfRating` when the rater authored the post
    pub async fn rate_post(&self, post_id: &str, rater: &User, value: i32) -> ServiceResult<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let post = self.get_post(post_id).await?;

        if post.author_id == rater.id {
            return Err(ServiceError::SelfRating);
        }

        self.post_repo
            .upsert_rating(post_id, &rater.id, value)
            .await
            .context("Failed to record rating")?;

        tracing::debug!(post_id = %post_id, rater_id = %rater.id, value, "rating submitted");

        Ok(())
    }

    /// Add a post to the user's saved set.
    ///
    /// # Errors
    /// - `NotFound` when the post doesn't exist
    /// - `Conflict` when the post is already saved
    pub async fn save_post(&self, user: &User, post_id: &str) -> ServiceResult<()> {
        // Confirm the post exists before touching the saved set
        self.get_post(post_id).await?;

        let inserted = self
            .user_repo
            .save_post(&user.id, post_id)
            .await
            .context("Failed to save post")?;

        if !inserted {
            return Err(ServiceError::Conflict("Post already saved".to_string()));
        }

        Ok(())
    }

    /// Remove a post from the user's saved set; removing an absent entry is
    /// a no-op
    pub async fn unsave_post(&self, user: &User, post_id: &str) -> ServiceResult<()> {
        Ok(self
            .user_repo
            .unsave_post(&user.id, post_id)
            .await
            .context("Failed to unsave post")?)
    }

    /// Whether the user has saved the post
    pub async fn is_saved(&self, user: &User, post_id: &str) -> ServiceResult<bool> {
        Ok(self
            .user_repo
            .is_post_saved(&user.id, post_id)
            .await
            .context("Failed to check saved post")?)
    }

    /// The user's saved posts, newest first.
    ///
    /// Saved references whose post has since been deleted are silently
    /// skipped rather than reported as errors.
    pub async fn list_saved(&self, user: &User) -> ServiceResult<Vec<Post>> {
        Ok(self
            .post_repo
            .list_saved_by_user(&user.id)
            .await
            .context("Failed to list saved posts")?)
    }

    /// Admin edit of any post field except the frozen snapshot
    pub async fn update_post(&self, post_id: &str, input: UpdatePostInput) -> ServiceResult<Post> {
        // Existence check first, for a clean NotFound
        self.get_post(post_id).await?;

        let mut input = input;
        if let Some(tags) = input.tags.take() {
            input.tags = Some(normalize_tags(tags));
        }

        let updated = self
            .post_repo
            .update(post_id, &input)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id = %post_id, "post updated");

        Ok(updated)
    }

    /// Delete a post (admin).
    ///
    /// Ordered idempotent steps: the post id is swept out of every saved set
    /// first, then the post row (with its ratings) is removed. A re-run
    /// after a partial failure converges to the same end state; a dangling
    /// saved reference left by a crash in between reads as "post gone".
    pub async fn delete_post(&self, post_id: &str) -> ServiceResult<()> {
        self.get_post(post_id).await?;

        self.user_repo
            .remove_saved_refs_to_post(post_id)
            .await
            .context("Failed to remove saved references")?;

        self.post_repo
            .delete(post_id)
            .await
            .context("Failed to delete post")?;

        tracing::info!(post_id = %post_id, "post deleted");

        Ok(())
    }

    fn validate_create_input(&self, input: &CreatePostInput) -> ServiceResult<()> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Post title cannot be empty".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Post content cannot be empty".to_string(),
            ));
        }
        if input.category.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Post category cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trim tags, drop empties, and deduplicate while preserving order
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
