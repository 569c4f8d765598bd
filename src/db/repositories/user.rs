//! User repository
//!
//! Database operations for user accounts and their saved-posts set.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Get user by email (expects a lowercased address)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get the user holding an unexpired reset token with the given digest
    async fn get_by_reset_token(&self, token_hash: &str) -> Result<Option<User>>;

    /// List all users, newest join first
    async fn list(&self) -> Result<Vec<User>>;

    /// Count all users
    async fn count(&self) -> Result<i64>;

    /// Persist the mutable fields of a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user row
    async fn delete(&self, id: &str) -> Result<()>;

    /// Add a post to the user's saved set.
    ///
    /// Returns false when the post was already in the set.
    async fn save_post(&self, user_id: &str, post_id: &str) -> Result<bool>;

    /// Remove a post from the user's saved set (no-op when absent)
    async fn unsave_post(&self, user_id: &str, post_id: &str) -> Result<()>;

    /// Whether the post is in the user's saved set
    async fn is_post_saved(&self, user_id: &str, post_id: &str) -> Result<bool>;

    /// Remove a post id from every user's saved set
    async fn remove_saved_refs_to_post(&self, post_id: &str) -> Result<u64>;

    /// Remove all saved-set rows belonging to a user
    async fn delete_saved_by_user(&self, user_id: &str) -> Result<u64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn get_by_reset_token(&self, token_hash: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_reset_token_sqlite(self.pool.as_sqlite().unwrap(), token_hash).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_reset_token_mysql(self.pool.as_mysql().unwrap(), token_hash).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_user_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_user_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn save_post(&self, user_id: &str, post_id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                save_post_sqlite(self.pool.as_sqlite().unwrap(), user_id, post_id).await
            }
            DatabaseDriver::Mysql => {
                save_post_mysql(self.pool.as_mysql().unwrap(), user_id, post_id).await
            }
        }
    }

    async fn unsave_post(&self, user_id: &str, post_id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unsave_post_sqlite(self.pool.as_sqlite().unwrap(), user_id, post_id).await
            }
            DatabaseDriver::Mysql => {
                unsave_post_mysql(self.pool.as_mysql().unwrap(), user_id, post_id).await
            }
        }
    }

    async fn is_post_saved(&self, user_id: &str, post_id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_post_saved_sqlite(self.pool.as_sqlite().unwrap(), user_id, post_id).await
            }
            DatabaseDriver::Mysql => {
                is_post_saved_mysql(self.pool.as_mysql().unwrap(), user_id, post_id).await
            }
        }
    }

    async fn remove_saved_refs_to_post(&self, post_id: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_saved_refs_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                remove_saved_refs_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }

    async fn delete_saved_by_user(&self, user_id: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_saved_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                delete_saved_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, profile_pic, bio, is_admin, \
                            is_blocked, created_at, reset_token_hash, reset_token_expires_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, profile_pic, bio, is_admin,
                           is_blocked, created_at, reset_token_hash, reset_token_expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.profile_pic)
    .bind(&user.bio)
    .bind(user.is_admin)
    .bind(user.is_blocked)
    .bind(user.created_at)
    .bind(&user.reset_token_hash)
    .bind(user.reset_token_expires_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user.clone())
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_reset_token_sqlite(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE reset_token_hash = ? AND reset_token_expires_at > ?",
        USER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
        .context("Failed to get user by reset token")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    Ok(rows.iter().map(row_to_user_sqlite).collect())
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, profile_pic = ?, bio = ?,
            is_admin = ?, is_blocked = ?, reset_token_hash = ?, reset_token_expires_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.profile_pic)
    .bind(&user.bio)
    .bind(user.is_admin)
    .bind(user.is_blocked)
    .bind(&user.reset_token_hash)
    .bind(user.reset_token_expires_at)
    .bind(&user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, &user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn save_post_sqlite(pool: &SqlitePool, user_id: &str, post_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO saved_posts (user_id, post_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to save post")?;

    Ok(result.rows_affected() > 0)
}

async fn unsave_post_sqlite(pool: &SqlitePool, user_id: &str, post_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM saved_posts WHERE user_id = ? AND post_id = ?")
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await
        .context("Failed to unsave post")?;

    Ok(())
}

async fn is_post_saved_sqlite(pool: &SqlitePool, user_id: &str, post_id: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM saved_posts WHERE user_id = ? AND post_id = ?",
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(pool)
    .await
    .context("Failed to check saved post")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn remove_saved_refs_sqlite(pool: &SqlitePool, post_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_posts WHERE post_id = ?")
        .bind(post_id)
        .execute(pool)
        .await
        .context("Failed to remove saved references")?;

    Ok(result.rows_affected())
}

async fn delete_saved_by_user_sqlite(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_posts WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete saved posts by user")?;

    Ok(result.rows_affected())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_pic: row.get("profile_pic"),
        bio: row.get("bio"),
        is_admin: row.get("is_admin"),
        is_blocked: row.get("is_blocked"),
        created_at: row.get("created_at"),
        reset_token_hash: row.get("reset_token_hash"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, profile_pic, bio, is_admin,
                           is_blocked, created_at, reset_token_hash, reset_token_expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.profile_pic)
    .bind(&user.bio)
    .bind(user.is_admin)
    .bind(user.is_blocked)
    .bind(user.created_at)
    .bind(&user.reset_token_hash)
    .bind(user.reset_token_expires_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user.clone())
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_user_by_reset_token_mysql(pool: &MySqlPool, token_hash: &str) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE reset_token_hash = ? AND reset_token_expires_at > ?",
        USER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
        .context("Failed to get user by reset token")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    Ok(rows.iter().map(row_to_user_mysql).collect())
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, profile_pic = ?, bio = ?,
            is_admin = ?, is_blocked = ?, reset_token_hash = ?, reset_token_expires_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.profile_pic)
    .bind(&user.bio)
    .bind(user.is_admin)
    .bind(user.is_blocked)
    .bind(&user.reset_token_hash)
    .bind(user.reset_token_expires_at)
    .bind(&user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_mysql(pool, &user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_user_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn save_post_mysql(pool: &MySqlPool, user_id: &str, post_id: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT IGNORE INTO saved_posts (user_id, post_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to save post")?;

    Ok(result.rows_affected() > 0)
}

async fn unsave_post_mysql(pool: &MySqlPool, user_id: &str, post_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM saved_posts WHERE user_id = ? AND post_id = ?")
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await
        .context("Failed to unsave post")?;

    Ok(())
}

async fn is_post_saved_mysql(pool: &MySqlPool, user_id: &str, post_id: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM saved_posts WHERE user_id = ? AND post_id = ?",
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(pool)
    .await
    .context("Failed to check saved post")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn remove_saved_refs_mysql(pool: &MySqlPool, post_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_posts WHERE post_id = ?")
        .bind(post_id)
        .execute(pool)
        .await
        .context("Failed to remove saved references")?;

    Ok(result.rows_affected())
}

async fn delete_saved_by_user_mysql(pool: &MySqlPool, user_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM saved_posts WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete saved posts by user")?;

    Ok(result.rows_affected())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_pic: row.get("profile_pic"),
        bio: row.get("bio"),
        is_admin: row.get("is_admin"),
        is_blocked: row.get("is_blocked"),
        created_at: row.get("created_at"),
        reset_token_hash: row.get("reset_token_hash"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
    }
}
