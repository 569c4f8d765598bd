//! Category service
//!
//! Business logic for category management:
//! - cached category listing
//! - admin-only creation with name uniqueness
//! - guarded deletion: a category referenced by any post cannot be removed

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{Category, CreateCategoryInput};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Cache TTL for the category list (1 hour)
const CATEGORY_CACHE_TTL_SECS: u64 = 3600;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:list";

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    post_repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        post_repo: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            post_repo,
            cache,
        }
    }

    /// List all categories (cached)
    pub async fn list(&self) -> ServiceResult<Vec<Category>> {
        if let Some(list) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list categories")?;

        let _ = self
            .cache
            .set(
                CACHE_KEY_CATEGORY_LIST,
                &list,
                Duration::from_secs(CATEGORY_CACHE_TTL_SECS),
            )
            .await;

        Ok(list)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Option<Category>> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?)
    }

    /// Create a new category.
    ///
    /// # Errors
    /// - `Validation` when name or description is empty
    /// - `Conflict` when a category with the same name already exists
    pub async fn create(&self, input: CreateCategoryInput) -> ServiceResult<Category> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }
        if input.description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Category description cannot be empty".to_string(),
            ));
        }

        if self
            .repo
            .exists_by_name(&input.name)
            .await
            .context("Failed to check name uniqueness")?
        {
            return Err(ServiceError::Conflict(
                "Category with this name already exists.".to_string(),
            ));
        }

        let category = Category::new(input.name, input.description, input.color);
        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;

        Ok(created)
    }

    /// Delete a category.
    ///
    /// # Errors
    /// - `NotFound` when the category doesn't exist
    /// - `Conflict` while any post still references the category by name
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let posts_in_category = self
            .post_repo
            .count_by_category(&category.name)
            .await
            .context("Failed to count posts in category")?;

        if posts_in_category > 0 {
            return Err(ServiceError::Conflict(
                "Cannot delete category with existing posts. Please re-assign posts first."
                    .to_string(),
            ));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        self.invalidate_cache().await;

        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_CATEGORY_LIST).await;
    }
}
