//! Location repository

use crate::db::DbPool;
use crate::models::{CreateLocationInput, Location, UpdateLocationInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &CreateLocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List all locations by name
    async fn list(&self) -> Result<Vec<Location>>;

    /// List published locations by name
    async fn list_published(&self) -> Result<Vec<Location>>;

    async fn update(&self, id: i64, input: &UpdateLocationInput) -> Result<Option<Location>>;

    /// Delete a location; posts keep existing without it
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DbPool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &CreateLocationInput) -> Result<Location> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(&input.name)
            .bind(input.is_published)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to create location")?;

        Ok(Location {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let row = sqlx::query("SELECT * FROM locations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get location")?;
        Ok(row.as_ref().map(row_to_location))
    }

    async fn list(&self) -> Result<Vec<Location>> {
        let rows = sqlx::query("SELECT * FROM locations ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list locations")?;
        Ok(rows.iter().map(row_to_location).collect())
    }

    async fn list_published(&self) -> Result<Vec<Location>> {
        let rows = sqlx::query("SELECT * FROM locations WHERE is_published = 1 ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list published locations")?;
        Ok(rows.iter().map(row_to_location).collect())
    }

    async fn update(&self, id: i64, input: &UpdateLocationInput) -> Result<Option<Location>> {
        let result = sqlx::query(
            "UPDATE locations SET name = COALESCE(?, name), is_published = COALESCE(?, is_published) WHERE id = ?",
        )
        .bind(input.name.as_deref())
        .bind(input.is_published)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update location")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete location")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_location(row: &SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
