//! Category service
//!
//! Staff-managed categories: create, update, delete, with slug format and
//! uniqueness checks. Deleting a category keeps its posts, uncategorized.

use crate::db::repositories::CategoryRepository;
use crate::models::{is_valid_slug, Category, CreateCategoryInput, UpdateCategoryInput, CATEGORY_TITLE_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for managing blog categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// All categories, published or not
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` for an empty or overlong title, or a malformed slug
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let input = CreateCategoryInput {
            title: input.title.trim().to_string(),
            slug: input.slug.trim().to_string(),
            ..input
        };
        validate_title(&input.title)?;
        validate_slug(&input.slug)?;
        self.ensure_slug_free(&input.slug, None).await?;

        let category = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;

        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Apply a partial update; absent fields keep their value
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let input = UpdateCategoryInput {
            title: input.title.map(|t| t.trim().to_string()),
            slug: input.slug.map(|s| s.trim().to_string()),
            ..input
        };
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(slug) = &input.slug {
            validate_slug(slug)?;
            self.ensure_slug_free(slug, Some(id)).await?;
        }

        let category = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))?;

        tracing::info!(category_id = id, is_published = category.is_published, "Category updated");
        Ok(category)
    }

    /// Delete a category; its posts lose the reference
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete category")? {
            return Err(CategoryServiceError::NotFound(id.to_string()));
        }
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, own_id: Option<i64>) -> Result<(), CategoryServiceError> {
        let existing = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?;
        match existing {
            Some(other) if Some(other.id) != own_id => {
                Err(CategoryServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), CategoryServiceError> {
    if title.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > CATEGORY_TITLE_MAX_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category title cannot exceed {} characters",
            CATEGORY_TITLE_MAX_LEN
        )));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), CategoryServiceError> {
    if !is_valid_slug(slug) {
        return Err(CategoryServiceError::ValidationError(format!(
            "Invalid slug '{}': use latin letters, digits, hyphens and underscores",
            slug
        )));
    }
    Ok(())
}
