//! Post repository
//!
//! Two read paths share one table:
//! - the public path (`list_published` / `count_published`) applies
//!   [`PUBLISHED_FILTER`] and is what every feed uses
//! - the administrative path (`list_all` / `count_all`) returns every post
//!
//! Both attach the live comment count and order by `pub_date` descending.

use crate::db::DbPool;
use crate::models::{
    ImageUpdate, ListParams, Post, PostAuthor, PostCategory, PostInput, PostLocation, PostView,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// SQL form of the "effectively published" predicate.
///
/// Expects the post aliased as `p`, its category LEFT JOINed as `c`, and
/// binds the current time once. Must stay in agreement with
/// `services::visibility::is_effectively_published`.
pub const PUBLISHED_FILTER: &str =
    "p.is_published = 1 AND p.pub_date <= ? AND (p.category_id IS NULL OR c.is_published = 1)";

/// Which posts a public feed covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Home feed
    All,
    /// Posts filed under one category
    Category(i64),
    /// Posts written by one user
    Author(i64),
}

impl PostScope {
    fn condition(&self) -> Option<&'static str> {
        match self {
            PostScope::All => None,
            PostScope::Category(_) => Some("p.category_id = ?"),
            PostScope::Author(_) => Some("p.author_id = ?"),
        }
    }

    fn bind_value(&self) -> Option<i64> {
        match self {
            PostScope::All => None,
            PostScope::Category(id) | PostScope::Author(id) => Some(*id),
        }
    }
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post owned by `author_id`
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Get the bare post row
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get the post with author, category, location and comment count,
    /// without applying any visibility rule
    async fn get_view(&self, id: i64) -> Result<Option<PostView>>;

    /// Overwrite the editable fields; the author never changes
    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>>;

    /// Delete a post and, through the foreign key, its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// One page of effectively published posts in `scope`
    async fn list_published(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<Vec<PostView>>;

    /// Number of effectively published posts in `scope`
    async fn count_published(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64>;

    /// One page of all posts regardless of state
    async fn list_all(&self, params: &ListParams) -> Result<Vec<PostView>>;

    /// Number of posts regardless of state
    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DbPool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        create_post(&self.pool, author_id, input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by ID")?;
        Ok(row.as_ref().map(row_to_post))
    }

    async fn get_view(&self, id: i64) -> Result<Option<PostView>> {
        let sql = format!("{} WHERE p.id = ?", VIEW_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post view")?;
        Ok(row.as_ref().map(row_to_view))
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>> {
        update_post(&self.pool, id, input).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_published(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<Vec<PostView>> {
        list_published_posts(&self.pool, scope, now, params).await
    }

    async fn count_published(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
        count_published_posts(&self.pool, scope, now).await
    }

    async fn list_all(&self, params: &ListParams) -> Result<Vec<PostView>> {
        let sql = format!("{} {} LIMIT ? OFFSET ?", VIEW_SELECT, VIEW_ORDER);
        let rows = sqlx::query(&sql)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts")?;
        Ok(rows.iter().map(row_to_view).collect())
    }

    async fn count_all(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM posts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;
        Ok(row.get("count"))
    }
}

const VIEW_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.image, p.pub_date, p.is_published, p.created_at,
           p.author_id, p.location_id, p.category_id,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           c.title AS category_title,
           c.slug AS category_slug,
           c.is_published AS category_is_published,
           l.name AS location_name,
           l.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const VIEW_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn published_where(scope: PostScope) -> String {
    match scope.condition() {
        Some(condition) => format!("WHERE {} AND {}", PUBLISHED_FILTER, condition),
        None => format!("WHERE {}", PUBLISHED_FILTER),
    }
}

async fn list_published_posts(
    pool: &DbPool,
    scope: PostScope,
    now: DateTime<Utc>,
    params: &ListParams,
) -> Result<Vec<PostView>> {
    let sql = format!(
        "{} {} {} LIMIT ? OFFSET ?",
        VIEW_SELECT,
        published_where(scope),
        VIEW_ORDER
    );

    let mut query = sqlx::query(&sql).bind(now);
    if let Some(value) = scope.bind_value() {
        query = query.bind(value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;

    Ok(rows.iter().map(row_to_view).collect())
}

async fn count_published_posts(pool: &DbPool, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) AS count FROM posts p LEFT JOIN categories c ON c.id = p.category_id {}",
        published_where(scope)
    );

    let mut query = sqlx::query(&sql).bind(now);
    if let Some(value) = scope.bind_value() {
        query = query.bind(value);
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;

    Ok(row.get("count"))
}

async fn create_post(pool: &DbPool, author_id: i64, input: &PostInput) -> Result<Post> {
    let now = Utc::now();
    let image = input.initial_image();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, image, pub_date, is_published, created_at, author_id, location_id, category_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(image.as_deref())
    .bind(input.pub_date)
    .bind(input.is_published)
    .bind(now)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        text: input.text.clone(),
        image,
        pub_date: input.pub_date,
        is_published: input.is_published,
        created_at: now,
        author_id,
        location_id: input.location_id,
        category_id: input.category_id,
    })
}

async fn update_post(pool: &DbPool, id: i64, input: &PostInput) -> Result<Option<Post>> {
    let (keep_image, new_image) = match &input.image {
        ImageUpdate::Keep => (true, None),
        ImageUpdate::Set(path) => (false, Some(path.as_str())),
        ImageUpdate::Clear => (false, None),
    };

    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, is_published = ?,
            location_id = ?, category_id = ?,
            image = CASE WHEN ? THEN image ELSE ? END
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.is_published)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(keep_image)
    .bind(new_image)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to reload post")?;
    Ok(row.as_ref().map(row_to_post))
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        image: row.get("image"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
    }
}

fn row_to_view(row: &SqliteRow) -> PostView {
    let post = row_to_post(row);

    let category = match (
        post.category_id,
        row.get::<Option<String>, _>("category_title"),
        row.get::<Option<String>, _>("category_slug"),
    ) {
        (Some(id), Some(title), Some(slug)) => Some(PostCategory {
            id,
            title,
            slug,
            is_published: row.get::<Option<bool>, _>("category_is_published").unwrap_or(false),
        }),
        _ => None,
    };

    let location = match (post.location_id, row.get::<Option<String>, _>("location_name")) {
        (Some(id), Some(name)) => Some(PostLocation {
            id,
            name,
            is_published: row.get::<Option<bool>, _>("location_is_published").unwrap_or(false),
        }),
        _ => None,
    };

    PostView {
        author: PostAuthor {
            id: post.author_id,
            username: row.get("author_username"),
            first_name: row.get("author_first_name"),
            last_name: row.get("author_last_name"),
        },
        category,
        location,
        comment_count: row.get("comment_count"),
        post,
    }
}
