//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Category>>;

    /// Get category by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories, ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Delete a category
    async fn delete(&self, id: &str) -> Result<()>;

    /// Check if a category name already exists
    async fn exists_by_name(&self, name: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_name_mysql(self.pool.as_mysql().unwrap(), name).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_name_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => {
                exists_by_name_mysql(self.pool.as_mysql().unwrap(), name).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, description, color)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.color)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category.clone())
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, description, color FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, description, color FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, description, color FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn delete_category_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .context("Failed to check category name existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, description, color)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.color)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category.clone())
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, description, color FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn get_category_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, description, color FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, description, color FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn delete_category_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .context("Failed to check category name existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    fn test_category(name: &str) -> Category {
        Category::new(
            name.to_string(),
            format!("Description for {}", name),
            None,
        )
    }

    #[tokio::test]
    async fn test_create_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&test_category("Health"))
            .await
            .expect("Failed to create category");

        assert_eq!(created.name, "Health");
        assert_eq!(created.color, "#808080");
    }

    #[tokio::test]
    async fn test_get_category_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&test_category("Health")).await.unwrap();

        let found = repo
            .get_by_id(&created.id)
            .await
            .expect("Failed to get category")
            .expect("Category not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Health");
    }

    #[tokio::test]
    async fn test_get_category_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id("missing").await.expect("Failed to get category");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_category_by_name() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_category("Work")).await.unwrap();

        let found = repo
            .get_by_name("Work")
            .await
            .expect("Failed to get category")
            .expect("Category not found");

        assert_eq!(found.name, "Work");
    }

    #[tokio::test]
    async fn test_list_categories_ordered_by_name() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&test_category("Work")).await.unwrap();
        repo.create(&test_category("Health")).await.unwrap();
        repo.create(&test_category("Life")).await.unwrap();

        let categories = repo.list().await.expect("Failed to list categories");

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Health", "Life", "Work"]);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&test_category("Gone")).await.unwrap();

        repo.delete(&created.id).await.expect("Failed to delete category");

        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_name() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&test_category("Health")).await.unwrap();

        assert!(repo.exists_by_name("Health").await.unwrap());
        assert!(!repo.exists_by_name("Missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_name_constraint() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&test_category("Health")).await.unwrap();
        let result = repo.create(&test_category("Health")).await;

        assert!(result.is_err(), "Should fail due to duplicate name");
    }
}
