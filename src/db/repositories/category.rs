//! Category repository
//!
//! Database operations for categories. Deleting a category leaves its posts
//! in place with the category reference cleared.

use crate::db::DbPool;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories, published or not, by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// List published categories, by title
    async fn list_published(&self) -> Result<Vec<Category>>;

    /// Apply a partial update
    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Option<Category>>;

    /// Delete a category; returns false if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DbPool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        create_category(&self.pool, input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get category by ID")?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get category by slug")?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY title, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn list_published(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE is_published = 1 ORDER BY title, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list published categories")?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Option<Category>> {
        update_category(&self.pool, id, input).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected() > 0)
    }
}

async fn create_category(pool: &DbPool, input: &CreateCategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn update_category(
    pool: &DbPool,
    id: i64,
    input: &UpdateCategoryInput,
) -> Result<Option<Category>> {
    // COALESCE keeps the stored value for every field left as NULL
    let result = sqlx::query(
        r#"
        UPDATE categories
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            slug = COALESCE(?, slug),
            is_published = COALESCE(?, is_published)
        WHERE id = ?
        "#,
    )
    .bind(input.title.as_deref())
    .bind(input.description.as_deref())
    .bind(input.slug.as_deref())
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to reload category")?;
    Ok(row.as_ref().map(row_to_category))
}

fn row_to_category(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
