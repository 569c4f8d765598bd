//! Rating and aggregation statistics
//!
//! All derived numeric facts of the platform are computed here: a post's
//! rating, an author's average and post count, and the platform-wide
//! aggregates shown on the admin dashboard.
//!
//! The computations are pure functions over rating tallies read from the
//! store. Nothing is cached and nothing here holds state, so concurrent
//! requests always see numbers consistent with what is persisted.
//!
//! Both the author average and the platform average are the unweighted mean
//! of per-post means: a post with one rating counts exactly as much as a
//! post with a hundred, and posts with no ratings are excluded from both the
//! numerator and the denominator. This is NOT a pooled mean over individual
//! rating values; the two diverge as soon as rating counts differ across
//! posts.

use crate::db::repositories::{PostRepository, UserRepository};
use crate::models::RatingTally;
use crate::services::error::ServiceResult;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Mean rating of a single post: in [1, 5] when rated, 0 when not.
pub fn post_rating(tally: &RatingTally) -> f64 {
    if tally.count == 0 {
        0.0
    } else {
        tally.sum as f64 / tally.count as f64
    }
}

/// Unweighted average of per-post means, excluding posts with no ratings.
///
/// Returns 0 when no post has a rating.
pub fn mean_of_means(tallies: &[RatingTally]) -> f64 {
    let mut sum_of_means = 0.0;
    let mut rated_posts = 0;

    for tally in tallies {
        if tally.count > 0 {
            sum_of_means += post_rating(tally);
            rated_posts += 1;
        }
    }

    if rated_posts == 0 {
        0.0
    } else {
        sum_of_means / rated_posts as f64
    }
}

/// Post count per category, sorted by descending count (name breaks ties)
pub fn category_popularity(counts: Vec<(String, i64)>) -> Vec<CategoryCount> {
    let mut popularity: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount { name, count })
        .collect();

    popularity.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    popularity
}

/// One entry of the category popularity ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// Category name
    pub name: String,
    /// Number of posts in the category
    pub count: i64,
}

/// An author's live statistics, recomputed from the store on every call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthorStats {
    /// Number of posts the author has published
    pub post_count: i64,
    /// Mean of the author's per-post means, 0 when nothing is rated
    pub avg_rating: f64,
}

/// Platform-wide aggregates for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStats {
    /// Total registered users
    pub total_users: i64,
    /// Total posts
    pub total_posts: i64,
    /// Posts published anonymously
    pub anonymous_posts: i64,
    /// Mean of per-post means across all rated posts
    pub avg_platform_rating: f64,
    /// Post counts per category, most popular first
    pub category_popularity: Vec<CategoryCount>,
}

/// Statistics service: feeds the pure computations from the repositories.
pub struct StatsService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl StatsService {
    /// Create a new statistics service
    pub fn new(post_repo: Arc<dyn PostRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            post_repo,
            user_repo,
        }
    }

    /// An author's current post count and average rating.
    ///
    /// Also used at post-creation time to capture the snapshot frozen onto
    /// the new post; called before the insert, it naturally counts only the
    /// author's pre-existing posts.
    pub async fn author_stats(&self, author_id: &str) -> ServiceResult<AuthorStats> {
        let post_count = self
            .post_repo
            .count_by_author(author_id)
            .await
            .context("Failed to count author posts")?;

        let tallies = self
            .post_repo
            .rating_tallies_by_author(author_id)
            .await
            .context("Failed to load author rating tallies")?;

        Ok(AuthorStats {
            post_count,
            avg_rating: mean_of_means(&tallies),
        })
    }

    /// Platform-wide statistics for the admin dashboard
    pub async fn platform_stats(&self) -> ServiceResult<PlatformStats> {
        let total_users = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        let total_posts = self
            .post_repo
            .count()
            .await
            .context("Failed to count posts")?;

        let anonymous_posts = self
            .post_repo
            .count_anonymous()
            .await
            .context("Failed to count anonymous posts")?;

        let tallies = self
            .post_repo
            .rating_tallies()
            .await
            .context("Failed to load platform rating tallies")?;

        let counts = self
            .post_repo
            .category_counts()
            .await
            .context("Failed to load category counts")?;

        Ok(PlatformStats {
            total_users,
            total_posts,
            anonymous_posts,
            avg_platform_rating: mean_of_means(&tallies),
            category_popularity: category_popularity(counts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPostRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreatePostInput, Post, PostBasis, User};
    use proptest::prelude::*;

    fn tally(count: i64, sum: i64) -> RatingTally {
        RatingTally { count, sum }
    }

    // ========================================================================
    // Pure function tests
    // ========================================================================

    #[test]
    fn test_post_rating_zero_when_unrated() {
        assert_eq!(post_rating(&tally(0, 0)), 0.0);
    }

    #[test]
    fn test_post_rating_is_arithmetic_mean() {
        // ratings 4, 5, 3
        assert_eq!(post_rating(&tally(3, 12)), 4.0);
        // a single rating
        assert_eq!(post_rating(&tally(1, 5)), 5.0);
    }

    #[test]
    fn test_mean_of_means_excludes_unrated_posts() {
        // One post rated 5.0, one post never rated: the author average is
        // 5.0, not 2.5.
        let tallies = [tally(1, 5), tally(0, 0)];
        assert_eq!(mean_of_means(&tallies), 5.0);
    }

    #[test]
    fn test_mean_of_means_is_unweighted() {
        // Post A: one hundred 5-star ratings. Post B: a single 1-star.
        // The unweighted mean of means is (5.0 + 1.0) / 2 = 3.0; a pooled
        // mean over individual values would be ~4.96.
        let tallies = [tally(100, 500), tally(1, 1)];
        assert_eq!(mean_of_means(&tallies), 3.0);
    }

    #[test]
    fn test_mean_of_means_zero_when_nothing_rated() {
        assert_eq!(mean_of_means(&[]), 0.0);
        assert_eq!(mean_of_means(&[tally(0, 0), tally(0, 0)]), 0.0);
    }

    #[test]
    fn test_category_popularity_sorted_descending() {
        let popularity = category_popularity(vec![
            ("Life".to_string(), 2),
            ("Work".to_string(), 5),
            ("Health".to_string(), 2),
        ]);

        assert_eq!(popularity[0].name, "Work");
        assert_eq!(popularity[0].count, 5);
        // equal counts fall back to name order
        assert_eq!(popularity[1].name, "Health");
        assert_eq!(popularity[2].name, "Life");

        let total: i64 = popularity.iter().map(|c| c.count).sum();
        assert_eq!(total, 9);
    }

    proptest! {
        /// A post's mean is within [1, 5] whenever it has ratings, equals the
        /// flat arithmetic mean of the values, and does not depend on the
        /// order the ratings arrived in.
        #[test]
        fn property_post_rating_bounds_and_permutation(
            mut values in proptest::collection::vec(1i64..=5, 1..50),
            seed in any::<u64>(),
        ) {
            let forward = tally(values.len() as i64, values.iter().sum());
            let expected = values.iter().sum::<i64>() as f64 / values.len() as f64;

            prop_assert!(post_rating(&forward) >= 1.0);
            prop_assert!(post_rating(&forward) <= 5.0);
            prop_assert_eq!(post_rating(&forward), expected);

            // Shuffle deterministically from the seed; the tally built from
            // any permutation is identical.
            let len = values.len();
            for i in (1..len).rev() {
                let j = (seed as usize).wrapping_mul(i) % (i + 1);
                values.swap(i, j);
            }
            let permuted = tally(values.len() as i64, values.iter().sum());
            prop_assert_eq!(forward, permuted);
        }

        /// The mean of means stays within [0, 5] and ignores unrated posts.
        #[test]
        fn property_mean_of_means_bounds(
            rated in proptest::collection::vec(proptest::collection::vec(1i64..=5, 1..20), 0..10),
            unrated_posts in 0usize..10,
        ) {
            let mut tallies: Vec<RatingTally> = rated
                .iter()
                .map(|values| tally(values.len() as i64, values.iter().sum()))
                .collect();
            let with_unrated = {
                let mut t = tallies.clone();
                t.extend(std::iter::repeat(tally(0, 0)).take(unrated_posts));
                t
            };

            let avg = mean_of_means(&tallies);
            prop_assert!(avg >= 0.0 && avg <= 5.0);

            // Adding unrated posts never moves the average
            prop_assert_eq!(avg, mean_of_means(&with_unrated));

            tallies.reverse();
            prop_assert_eq!(avg, mean_of_means(&tallies));
        }
    }

    // ========================================================================
    // Service tests against in-memory SQLite
    // ========================================================================

    struct Fixture {
        users: Arc<SqlxUserRepository>,
        posts: Arc<SqlxPostRepository>,
        stats: StatsService,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = Arc::new(SqlxUserRepository::new(pool.clone()));
        let posts = Arc::new(SqlxPostRepository::new(pool.clone()));
        let stats = StatsService::new(posts.clone(), users.clone());

        Fixture {
            users,
            posts,
            stats,
        }
    }

    async fn create_user(fixture: &Fixture, name: &str) -> User {
        let user = User::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".to_string(),
            false,
        );
        fixture.users.create(&user).await.expect("Failed to create user")
    }

    async fn create_post(fixture: &Fixture, author: &User, title: &str, category: &str) -> Post {
        let post = Post::new(
            CreatePostInput {
                title: title.to_string(),
                content: "Content".to_string(),
                category: category.to_string(),
                basis: PostBasis::Opinion,
                tags: vec![],
                anonymous: false,
            },
            author.id.clone(),
            author.name.clone(),
            0.0,
            0,
        );
        fixture.posts.create(&post).await.expect("Failed to create post")
    }

    #[tokio::test]
    async fn test_author_stats_excludes_unrated_posts() {
        let fixture = setup().await;
        let author = create_user(&fixture, "Author").await;
        let rater = create_user(&fixture, "Rater").await;

        let rated = create_post(&fixture, &author, "Rated", "Life").await;
        create_post(&fixture, &author, "Unrated", "Life").await;

        fixture.posts.upsert_rating(&rated.id, &rater.id, 5).await.unwrap();

        let stats = fixture.stats.author_stats(&author.id).await.unwrap();
        assert_eq!(stats.post_count, 2);
        assert_eq!(stats.avg_rating, 5.0);
    }

    #[tokio::test]
    async fn test_author_stats_empty_author() {
        let fixture = setup().await;
        let author = create_user(&fixture, "Quiet").await;

        let stats = fixture.stats.author_stats(&author.id).await.unwrap();
        assert_eq!(stats.post_count, 0);
        assert_eq!(stats.avg_rating, 0.0);
    }

    #[tokio::test]
    async fn test_author_stats_mean_of_means() {
        let fixture = setup().await;
        let author = create_user(&fixture, "Author").await;
        let r1 = create_user(&fixture, "One").await;
        let r2 = create_user(&fixture, "Two").await;
        let r3 = create_user(&fixture, "Three").await;

        // Post A: ratings 5, 5, 5 -> mean 5.0. Post B: rating 2 -> mean 2.0.
        // Author average must be 3.5 (not the pooled 17/4 = 4.25).
        let a = create_post(&fixture, &author, "A", "Life").await;
        let b = create_post(&fixture, &author, "B", "Life").await;

        fixture.posts.upsert_rating(&a.id, &r1.id, 5).await.unwrap();
        fixture.posts.upsert_rating(&a.id, &r2.id, 5).await.unwrap();
        fixture.posts.upsert_rating(&a.id, &r3.id, 5).await.unwrap();
        fixture.posts.upsert_rating(&b.id, &r1.id, 2).await.unwrap();

        let stats = fixture.stats.author_stats(&author.id).await.unwrap();
        assert_eq!(stats.avg_rating, 3.5);
    }

    #[tokio::test]
    async fn test_platform_stats() {
        let fixture = setup().await;
        let author = create_user(&fixture, "Author").await;
        let rater = create_user(&fixture, "Rater").await;

        let life1 = create_post(&fixture, &author, "L1", "Life").await;
        create_post(&fixture, &author, "L2", "Life").await;
        create_post(&fixture, &author, "W1", "Work").await;

        let anon = Post::new(
            CreatePostInput {
                title: "Anon".to_string(),
                content: "Content".to_string(),
                category: "Work".to_string(),
                basis: PostBasis::Other,
                tags: vec![],
                anonymous: true,
            },
            author.id.clone(),
            author.name.clone(),
            0.0,
            0,
        );
        fixture.posts.create(&anon).await.unwrap();

        fixture.posts.upsert_rating(&life1.id, &rater.id, 4).await.unwrap();

        let stats = fixture.stats.platform_stats().await.unwrap();

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_posts, 4);
        assert_eq!(stats.anonymous_posts, 1);
        assert_eq!(stats.avg_platform_rating, 4.0);

        // Popularity sorted descending and summing to the number of posts
        assert_eq!(stats.category_popularity.len(), 2);
        assert!(stats.category_popularity[0].count >= stats.category_popularity[1].count);
        let total: i64 = stats.category_popularity.iter().map(|c| c.count).sum();
        assert_eq!(total, 4);
    }
}
