//! Comment repository

use crate::db::DbPool;
use crate::models::{Comment, CommentInput, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment on `post_id` written by `author_id`
    async fn create(&self, post_id: i64, author_id: i64, input: &CommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// All comments on a post, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the comment text
    async fn update(&self, id: i64, input: &CommentInput) -> Result<Option<Comment>>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DbPool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, input: &CommentInput) -> Result<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.text)
        .bind(post_id)
        .bind(author_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            text: input.text.clone(),
            post_id,
            author_id,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment")?;
        Ok(row.as_ref().map(row_to_comment))
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query(
            r#"
            SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at,
                   u.username AS author_username
            FROM comments cm
            JOIN users u ON u.id = cm.author_id
            WHERE cm.post_id = ?
            ORDER BY cm.created_at ASC, cm.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comments")?;

        Ok(rows
            .iter()
            .map(|row| CommentWithAuthor {
                comment: row_to_comment(row),
                author_username: row.get("author_username"),
            })
            .collect())
    }

    async fn update(&self, id: i64, input: &CommentInput) -> Result<Option<Comment>> {
        let result = sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(&input.text)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update comment")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[tokio::test]
    async fn test_list_for_post_oldest_first_with_author() {
        let pool = fixtures::migrated_pool().await;
        let anna = fixtures::user(&pool, "anna").await;
        let boris = fixtures::user(&pool, "boris").await;
        let post = fixtures::post_in(&pool, anna.id, None).await;
        let other = fixtures::post_in(&pool, anna.id, None).await;
        let repo = SqlxCommentRepository::boxed(pool);

        let first = repo.create(post.id, boris.id, &CommentInput::new("first")).await.unwrap();
        let second = repo.create(post.id, anna.id, &CommentInput::new("second")).await.unwrap();
        repo.create(other.id, anna.id, &CommentInput::new("elsewhere")).await.unwrap();

        let comments = repo.list_for_post(post.id).await.expect("Failed to list");
        let ids: Vec<i64> = comments.iter().map(|c| c.comment.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(comments[0].author_username, "boris");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = fixtures::migrated_pool().await;
        let anna = fixtures::user(&pool, "anna").await;
        let post = fixtures::post_in(&pool, anna.id, None).await;
        let repo = SqlxCommentRepository::boxed(pool);

        let comment = repo.create(post.id, anna.id, &CommentInput::new("typo")).await.unwrap();
        let updated = repo
            .update(comment.id, &CommentInput::new("fixed"))
            .await
            .unwrap()
            .expect("Missing");
        assert_eq!(updated.text, "fixed");
        assert_eq!(updated.created_at, comment.created_at);

        assert!(repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
        assert!(repo.update(comment.id, &CommentInput::new("x")).await.unwrap().is_none());
    }
}
