//! Post repository
//!
//! Database operations for posts, their embedded per-rater ratings, and the
//! aggregation queries feeding the statistics computations.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Rating writes are single-statement upserts keyed on (post_id, rater_id):
//! concurrent submissions from different raters are both recorded, while a
//! racing pair from the same rater resolves last-write-wins.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Post, PostBasis, PostQuery, PostSort, RatingTally, UpdatePostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID, with its current rating tally
    async fn get_by_id(&self, id: &str) -> Result<Option<Post>>;

    /// List posts matching the query (search/category/tag filters, sort, limit)
    async fn list(&self, query: &PostQuery) -> Result<Vec<Post>>;

    /// List posts by an author, newest first, optionally hiding anonymous ones
    async fn list_by_author(&self, author_id: &str, exclude_anonymous: bool) -> Result<Vec<Post>>;

    /// List the posts in a user's saved set, newest first.
    ///
    /// Joins the posts table, so saved references to deleted posts drop out.
    async fn list_saved_by_user(&self, user_id: &str) -> Result<Vec<Post>>;

    /// Apply an edit to a post and return the updated row
    async fn update(&self, id: &str, input: &UpdatePostInput) -> Result<Post>;

    /// Delete a post row (its ratings go with it)
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every post authored by a user, returning how many were removed
    async fn delete_by_author(&self, author_id: &str) -> Result<u64>;

    /// Count all posts
    async fn count(&self) -> Result<i64>;

    /// Count posts authored by a user
    async fn count_by_author(&self, author_id: &str) -> Result<i64>;

    /// Count anonymous posts
    async fn count_anonymous(&self) -> Result<i64>;

    /// Count posts referencing a category by name
    async fn count_by_category(&self, category_name: &str) -> Result<i64>;

    /// Post counts grouped by category name
    async fn category_counts(&self) -> Result<Vec<(String, i64)>>;

    /// Insert or replace a rater's rating on a post as one atomic statement
    async fn upsert_rating(&self, post_id: &str, rater_id: &str, value: i32) -> Result<()>;

    /// Get the rating a rater has given a post, if any
    async fn get_rating(&self, post_id: &str, rater_id: &str) -> Result<Option<i32>>;

    /// Delete every rating a user has given, returning how many were removed
    async fn delete_ratings_by_rater(&self, rater_id: &str) -> Result<u64>;

    /// Per-post rating tallies for an author's posts (zero-rating posts included)
    async fn rating_tallies_by_author(&self, author_id: &str) -> Result<Vec<RatingTally>>;

    /// Per-post rating tallies across the whole platform
    async fn rating_tallies(&self) -> Result<Vec<RatingTally>>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, query: &PostQuery) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.as_sqlite().unwrap(), query).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.as_mysql().unwrap(), query).await,
        }
    }

    async fn list_by_author(&self, author_id: &str, exclude_anonymous: bool) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id, exclude_anonymous)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_by_author_mysql(self.pool.as_mysql().unwrap(), author_id, exclude_anonymous)
                    .await
            }
        }
    }

    async fn list_saved_by_user(&self, user_id: &str) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_saved_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                list_saved_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn update(&self, id: &str, input: &UpdatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_post_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => {
                update_post_mysql(self.pool.as_mysql().unwrap(), id, input).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete_by_author(&self, author_id: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id).await
            }
            DatabaseDriver::Mysql => {
                delete_by_author_mysql(self.pool.as_mysql().unwrap(), author_id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_where_sqlite(self.pool.as_sqlite().unwrap(), "1 = 1", None).await
            }
            DatabaseDriver::Mysql => {
                count_where_mysql(self.pool.as_mysql().unwrap(), "1 = 1", None).await
            }
        }
    }

    async fn count_by_author(&self, author_id: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_where_sqlite(self.pool.as_sqlite().unwrap(), "author_id = ?", Some(author_id))
                    .await
            }
            DatabaseDriver::Mysql => {
                count_where_mysql(self.pool.as_mysql().unwrap(), "author_id = ?", Some(author_id))
                    .await
            }
        }
    }

    async fn count_anonymous(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_where_sqlite(self.pool.as_sqlite().unwrap(), "anonymous = 1", None).await
            }
            DatabaseDriver::Mysql => {
                count_where_mysql(self.pool.as_mysql().unwrap(), "anonymous = 1", None).await
            }
        }
    }

    async fn count_by_category(&self, category_name: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_where_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    "category = ?",
                    Some(category_name),
                )
                .await
            }
            DatabaseDriver::Mysql => {
                count_where_mysql(
                    self.pool.as_mysql().unwrap(),
                    "category = ?",
                    Some(category_name),
                )
                .await
            }
        }
    }

    async fn category_counts(&self) -> Result<Vec<(String, i64)>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => category_counts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => category_counts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn upsert_rating(&self, post_id: &str, rater_id: &str, value: i32) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_rating_sqlite(self.pool.as_sqlite().unwrap(), post_id, rater_id, value).await
            }
            DatabaseDriver::Mysql => {
                upsert_rating_mysql(self.pool.as_mysql().unwrap(), post_id, rater_id, value).await
            }
        }
    }

    async fn get_rating(&self, post_id: &str, rater_id: &str) -> Result<Option<i32>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_rating_sqlite(self.pool.as_sqlite().unwrap(), post_id, rater_id).await
            }
            DatabaseDriver::Mysql => {
                get_rating_mysql(self.pool.as_mysql().unwrap(), post_id, rater_id).await
            }
        }
    }

    async fn delete_ratings_by_rater(&self, rater_id: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_ratings_by_rater_sqlite(self.pool.as_sqlite().unwrap(), rater_id).await
            }
            DatabaseDriver::Mysql => {
                delete_ratings_by_rater_mysql(self.pool.as_mysql().unwrap(), rater_id).await
            }
        }
    }

    async fn rating_tallies_by_author(&self, author_id: &str) -> Result<Vec<RatingTally>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                rating_tallies_sqlite(self.pool.as_sqlite().unwrap(), Some(author_id)).await
            }
            DatabaseDriver::Mysql => {
                rating_tallies_mysql(self.pool.as_mysql().unwrap(), Some(author_id)).await
            }
        }
    }

    async fn rating_tallies(&self) -> Result<Vec<RatingTally>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                rating_tallies_sqlite(self.pool.as_sqlite().unwrap(), None).await
            }
            DatabaseDriver::Mysql => rating_tallies_mysql(self.pool.as_mysql().unwrap(), None).await,
        }
    }
}

// Shared SELECT: posts joined with their aggregated rating tallies. The
// tallies are recomputed on every read; nothing derived is stored.
const SELECT_POSTS_SQLITE: &str = r#"
    SELECT p.id, p.title, p.content, p.category, p.basis, p.tags, p.author_id, p.anonymous,
           p.author_name, p.author_avg_rating, p.author_post_count, p.created_at,
           COALESCE(r.rating_count, 0) AS rating_count,
           COALESCE(r.rating_sum, 0) AS rating_sum
    FROM posts p
    LEFT JOIN (
        SELECT post_id, COUNT(*) AS rating_count, CAST(SUM(value) AS INTEGER) AS rating_sum
        FROM ratings
        GROUP BY post_id
    ) r ON r.post_id = p.id
"#;

const SELECT_POSTS_MYSQL: &str = r#"
    SELECT p.id, p.title, p.content, p.category, p.basis, p.tags, p.author_id, p.anonymous,
           p.author_name, p.author_avg_rating, p.author_post_count, p.created_at,
           COALESCE(r.rating_count, 0) AS rating_count,
           COALESCE(r.rating_sum, 0) AS rating_sum
    FROM posts p
    LEFT JOIN (
        SELECT post_id, COUNT(*) AS rating_count, CAST(SUM(value) AS SIGNED) AS rating_sum
        FROM ratings
        GROUP BY post_id
    ) r ON r.post_id = p.id
"#;

fn order_clause(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Newest => "ORDER BY p.created_at DESC",
        PostSort::Oldest => "ORDER BY p.created_at ASC",
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let tags = serde_json::to_string(&post.tags).context("Failed to serialize tags")?;

    sqlx::query(
        r#"
        INSERT INTO posts (id, title, content, category, basis, tags, author_id, anonymous,
                           author_name, author_avg_rating, author_post_count, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(post.basis.as_str())
    .bind(&tags)
    .bind(&post.author_id)
    .bind(post.anonymous)
    .bind(&post.author_name)
    .bind(post.author_avg_rating)
    .bind(post.author_post_count)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post.clone())
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Post>> {
    let sql = format!("{} WHERE p.id = ?", SELECT_POSTS_SQLITE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(pool: &SqlitePool, query: &PostQuery) -> Result<Vec<Post>> {
    let limit = query.limit.unwrap_or(i64::MAX);
    let order = order_clause(query.sort);

    let rows = if let Some(keyword) = &query.search {
        let pattern = format!("%{}%", keyword);
        let sql = format!(
            "{} WHERE (p.title LIKE ? OR p.content LIKE ? OR p.author_name LIKE ? OR p.tags LIKE ?) {} LIMIT ?",
            SELECT_POSTS_SQLITE, order
        );
        sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to search posts")?
    } else {
        let sql = format!(
            r#"{} WHERE (? IS NULL OR p.category = ?)
               AND (? IS NULL OR EXISTS (
                   SELECT 1 FROM json_each(p.tags) WHERE json_each.value = ?
               )) {} LIMIT ?"#,
            SELECT_POSTS_SQLITE, order
        );
        sqlx::query(&sql)
            .bind(query.category.as_deref())
            .bind(query.category.as_deref())
            .bind(query.tag.as_deref())
            .bind(query.tag.as_deref())
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to list posts")?
    };

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_by_author_sqlite(
    pool: &SqlitePool,
    author_id: &str,
    exclude_anonymous: bool,
) -> Result<Vec<Post>> {
    let anonymous_filter = if exclude_anonymous {
        " AND p.anonymous = 0"
    } else {
        ""
    };
    let sql = format!(
        "{} WHERE p.author_id = ?{} ORDER BY p.created_at DESC",
        SELECT_POSTS_SQLITE, anonymous_filter
    );

    let rows = sqlx::query(&sql)
        .bind(author_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_saved_by_user_sqlite(pool: &SqlitePool, user_id: &str) -> Result<Vec<Post>> {
    let sql = format!(
        r#"{} INNER JOIN saved_posts sp ON sp.post_id = p.id
           WHERE sp.user_id = ? ORDER BY p.created_at DESC"#,
        SELECT_POSTS_SQLITE
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list saved posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn update_post_sqlite(pool: &SqlitePool, id: &str, input: &UpdatePostInput) -> Result<Post> {
    let mut post = get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found: {}", id))?;

    apply_update(&mut post, input);
    let tags = serde_json::to_string(&post.tags).context("Failed to serialize tags")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, category = ?, basis = ?, tags = ?, anonymous = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(post.basis.as_str())
    .bind(&tags)
    .bind(post.anonymous)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post)
}

async fn delete_post_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn delete_by_author_sqlite(pool: &SqlitePool, author_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM posts WHERE author_id = ?")
        .bind(author_id)
        .execute(pool)
        .await
        .context("Failed to delete posts by author")?;

    Ok(result.rows_affected())
}

async fn count_where_sqlite(
    pool: &SqlitePool,
    condition: &str,
    bind: Option<&str>,
) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM posts WHERE {}", condition);
    let mut query = sqlx::query(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }

    let row = query.fetch_one(pool).await.context("Failed to count posts")?;
    Ok(row.get("count"))
}

async fn category_counts_sqlite(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query("SELECT category, COUNT(*) as post_count FROM posts GROUP BY category")
        .fetch_all(pool)
        .await
        .context("Failed to count posts per category")?;

    Ok(rows
        .iter()
        .map(|row| (row.get("category"), row.get("post_count")))
        .collect())
}

async fn upsert_rating_sqlite(
    pool: &SqlitePool,
    post_id: &str,
    rater_id: &str,
    value: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ratings (post_id, rater_id, value, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(post_id, rater_id) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(post_id)
    .bind(rater_id)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to upsert rating")?;

    Ok(())
}

async fn get_rating_sqlite(
    pool: &SqlitePool,
    post_id: &str,
    rater_id: &str,
) -> Result<Option<i32>> {
    let row = sqlx::query("SELECT value FROM ratings WHERE post_id = ? AND rater_id = ?")
        .bind(post_id)
        .bind(rater_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get rating")?;

    Ok(row.map(|row| row.get("value")))
}

async fn delete_ratings_by_rater_sqlite(pool: &SqlitePool, rater_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ratings WHERE rater_id = ?")
        .bind(rater_id)
        .execute(pool)
        .await
        .context("Failed to delete ratings by rater")?;

    Ok(result.rows_affected())
}

async fn rating_tallies_sqlite(
    pool: &SqlitePool,
    author_id: Option<&str>,
) -> Result<Vec<RatingTally>> {
    let filter = if author_id.is_some() {
        "WHERE p.author_id = ?"
    } else {
        ""
    };
    let sql = format!(
        r#"
        SELECT COUNT(rt.value) AS rating_count,
               CAST(COALESCE(SUM(rt.value), 0) AS INTEGER) AS rating_sum
        FROM posts p
        LEFT JOIN ratings rt ON rt.post_id = p.id
        {}
        GROUP BY p.id
        "#,
        filter
    );

    let mut query = sqlx::query(&sql);
    if let Some(author_id) = author_id {
        query = query.bind(author_id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load rating tallies")?;

    Ok(rows
        .iter()
        .map(|row| RatingTally {
            count: row.get("rating_count"),
            sum: row.get("rating_sum"),
        })
        .collect())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let basis: String = row.get("basis");
    let tags: String = row.get("tags");

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category: row.get("category"),
        basis: PostBasis::from_str(&basis)
            .ok_or_else(|| anyhow::anyhow!("Invalid post basis: {}", basis))?,
        tags: serde_json::from_str(&tags).context("Failed to parse post tags")?,
        author_id: row.get("author_id"),
        anonymous: row.get("anonymous"),
        author_name: row.get("author_name"),
        author_avg_rating: row.get("author_avg_rating"),
        author_post_count: row.get("author_post_count"),
        created_at: row.get("created_at"),
        rating_count: row.get("rating_count"),
        rating_sum: row.get("rating_sum"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let tags = serde_json::to_string(&post.tags).context("Failed to serialize tags")?;

    sqlx::query(
        r#"
        INSERT INTO posts (id, title, content, category, basis, tags, author_id, anonymous,
                           author_name, author_avg_rating, author_post_count, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(post.basis.as_str())
    .bind(&tags)
    .bind(&post.author_id)
    .bind(post.anonymous)
    .bind(&post.author_name)
    .bind(post.author_avg_rating)
    .bind(post.author_post_count)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post.clone())
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Post>> {
    let sql = format!("{} WHERE p.id = ?", SELECT_POSTS_MYSQL);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_mysql(pool: &MySqlPool, query: &PostQuery) -> Result<Vec<Post>> {
    let limit = query.limit.unwrap_or(i64::MAX);
    let order = order_clause(query.sort);

    let rows = if let Some(keyword) = &query.search {
        let pattern = format!("%{}%", keyword);
        let sql = format!(
            "{} WHERE (p.title LIKE ? OR p.content LIKE ? OR p.author_name LIKE ? OR p.tags LIKE ?) {} LIMIT ?",
            SELECT_POSTS_MYSQL, order
        );
        sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to search posts")?
    } else {
        let sql = format!(
            r#"{} WHERE (? IS NULL OR p.category = ?)
               AND (? IS NULL OR JSON_CONTAINS(p.tags, JSON_QUOTE(?))) {} LIMIT ?"#,
            SELECT_POSTS_MYSQL, order
        );
        sqlx::query(&sql)
            .bind(query.category.as_deref())
            .bind(query.category.as_deref())
            .bind(query.tag.as_deref())
            .bind(query.tag.as_deref())
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to list posts")?
    };

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_by_author_mysql(
    pool: &MySqlPool,
    author_id: &str,
    exclude_anonymous: bool,
) -> Result<Vec<Post>> {
    let anonymous_filter = if exclude_anonymous {
        " AND p.anonymous = 0"
    } else {
        ""
    };
    let sql = format!(
        "{} WHERE p.author_id = ?{} ORDER BY p.created_at DESC",
        SELECT_POSTS_MYSQL, anonymous_filter
    );

    let rows = sqlx::query(&sql)
        .bind(author_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_saved_by_user_mysql(pool: &MySqlPool, user_id: &str) -> Result<Vec<Post>> {
    let sql = format!(
        r#"{} INNER JOIN saved_posts sp ON sp.post_id = p.id
           WHERE sp.user_id = ? ORDER BY p.created_at DESC"#,
        SELECT_POSTS_MYSQL
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list saved posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn update_post_mysql(pool: &MySqlPool, id: &str, input: &UpdatePostInput) -> Result<Post> {
    let mut post = get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found: {}", id))?;

    apply_update(&mut post, input);
    let tags = serde_json::to_string(&post.tags).context("Failed to serialize tags")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, category = ?, basis = ?, tags = ?, anonymous = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(post.basis.as_str())
    .bind(&tags)
    .bind(post.anonymous)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post)
}

async fn delete_post_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn delete_by_author_mysql(pool: &MySqlPool, author_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM posts WHERE author_id = ?")
        .bind(author_id)
        .execute(pool)
        .await
        .context("Failed to delete posts by author")?;

    Ok(result.rows_affected())
}

async fn count_where_mysql(pool: &MySqlPool, condition: &str, bind: Option<&str>) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM posts WHERE {}", condition);
    let mut query = sqlx::query(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }

    let row = query.fetch_one(pool).await.context("Failed to count posts")?;
    Ok(row.get("count"))
}

async fn category_counts_mysql(pool: &MySqlPool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query("SELECT category, COUNT(*) as post_count FROM posts GROUP BY category")
        .fetch_all(pool)
        .await
        .context("Failed to count posts per category")?;

    Ok(rows
        .iter()
        .map(|row| (row.get("category"), row.get("post_count")))
        .collect())
}

async fn upsert_rating_mysql(
    pool: &MySqlPool,
    post_id: &str,
    rater_id: &str,
    value: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ratings (post_id, rater_id, value, created_at)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE value = VALUES(value)
        "#,
    )
    .bind(post_id)
    .bind(rater_id)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to upsert rating")?;

    Ok(())
}

async fn get_rating_mysql(pool: &MySqlPool, post_id: &str, rater_id: &str) -> Result<Option<i32>> {
    let row = sqlx::query("SELECT value FROM ratings WHERE post_id = ? AND rater_id = ?")
        .bind(post_id)
        .bind(rater_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get rating")?;

    Ok(row.map(|row| row.get("value")))
}

async fn delete_ratings_by_rater_mysql(pool: &MySqlPool, rater_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ratings WHERE rater_id = ?")
        .bind(rater_id)
        .execute(pool)
        .await
        .context("Failed to delete ratings by rater")?;

    Ok(result.rows_affected())
}

async fn rating_tallies_mysql(
    pool: &MySqlPool,
    author_id: Option<&str>,
) -> Result<Vec<RatingTally>> {
    let filter = if author_id.is_some() {
        "WHERE p.author_id = ?"
    } else {
        ""
    };
    let sql = format!(
        r#"
        SELECT COUNT(rt.value) AS rating_count,
               CAST(COALESCE(SUM(rt.value), 0) AS SIGNED) AS rating_sum
        FROM posts p
        LEFT JOIN ratings rt ON rt.post_id = p.id
        {}
        GROUP BY p.id
        "#,
        filter
    );

    let mut query = sqlx::query(&sql);
    if let Some(author_id) = author_id {
        query = query.bind(author_id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load rating tallies")?;

    Ok(rows
        .iter()
        .map(|row| RatingTally {
            count: row.get("rating_count"),
            sum: row.get("rating_sum"),
        })
        .collect())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let basis: String = row.get("basis");
    let tags: String = row.get("tags");

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category: row.get("category"),
        basis: PostBasis::from_str(&basis)
            .ok_or_else(|| anyhow::anyhow!("Invalid post basis: {}", basis))?,
        tags: serde_json::from_str(&tags).context("Failed to parse post tags")?,
        author_id: row.get("author_id"),
        anonymous: row.get("anonymous"),
        author_name: row.get("author_name"),
        author_avg_rating: row.get("author_avg_rating"),
        author_post_count: row.get("author_post_count"),
        created_at: row.get("created_at"),
        rating_count: row.get("rating_count"),
        rating_sum: row.get("rating_sum"),
    })
}

// ============================================================================
// Shared helpers
// ============================================================================

fn apply_update(post: &mut Post, input: &UpdatePostInput) {
    if let Some(title) = &input.title {
        post.title = title.clone();
    }
    if let Some(content) = &input.content {
        post.content = content.clone();
    }
    if let Some(category) = &input.category {
        post.category = category.clone();
    }
    if let Some(basis) = input.basis {
        post.basis = basis;
    }
    if let Some(tags) = &input.tags {
        post.tags = tags.clone();
    }
    if let Some(anonymous) = input.anonymous {
        post.anonymous = anonymous;
    }
}
