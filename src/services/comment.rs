//! Comment service
//!
//! Comments are attached to a post the actor can see. Edits and deletes
//! address a comment through its post: a comment reached through the wrong
//! post does not exist.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentInput, CommentWithAuthor, PostView, User};
use crate::services::policy::{authorize, Action, Actor, Target};
use crate::services::visibility::can_view;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Comments under a post, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self
            .comments
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    /// The post a new comment would go under, if `actor` can see it
    pub async fn target_post(&self, post_id: i64, actor: &Actor) -> Result<PostView, CommentServiceError> {
        let view = self
            .posts
            .get_view(post_id)
            .await
            .context("Failed to get post")?
            .filter(|view| can_view(actor, view, Utc::now()))
            .ok_or_else(|| post_not_found(post_id))?;
        Ok(view)
    }

    /// Add a comment by `author` under `post_id`
    pub async fn create(
        &self,
        post_id: i64,
        author: &User,
        input: CommentInput,
    ) -> Result<Comment, CommentServiceError> {
        self.target_post(post_id, &Actor::User(author.clone())).await?;
        let input = validate(input)?;

        let comment = self
            .comments
            .create(post_id, author.id, &input)
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, post_id, author_id = author.id, "Comment created");
        Ok(comment)
    }

    /// Look up a comment through its post and check that `actor` owns it
    ///
    /// The post is returned whether or not it is published: owning the
    /// comment is enough.
    pub async fn get_owned(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        action: Action,
    ) -> Result<(PostView, Comment), CommentServiceError> {
        let post = self
            .posts
            .get_view(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| post_not_found(post_id))?;

        let comment = self
            .comments
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        authorize(actor, Target::from(&comment), action).map_err(|_| CommentServiceError::Forbidden)?;
        Ok((post, comment))
    }

    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        input: CommentInput,
    ) -> Result<Comment, CommentServiceError> {
        self.get_owned(post_id, comment_id, actor, Action::Edit).await?;
        let input = validate(input)?;

        let comment = self
            .comments
            .update(comment_id, &input)
            .await
            .context("Failed to update comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment_id)))?;

        tracing::info!(comment_id, post_id, "Comment updated");
        Ok(comment)
    }

    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
    ) -> Result<(), CommentServiceError> {
        self.get_owned(post_id, comment_id, actor, Action::Delete).await?;
        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id, post_id, "Comment deleted");
        Ok(())
    }

    /// Delete any comment; staff only
    pub async fn moderate_delete(&self, comment_id: i64) -> Result<(), CommentServiceError> {
        let deleted = self
            .comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(format!("comment {}", comment_id)));
        }

        tracing::info!(comment_id, "Comment removed by staff");
        Ok(())
    }
}

fn validate(input: CommentInput) -> Result<CommentInput, CommentServiceError> {
    if input.text.trim().is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Comment text is required.".to_string(),
        ));
    }
    Ok(input)
}

fn post_not_found(id: i64) -> CommentServiceError {
    CommentServiceError::NotFound(format!("post {}", id))
}
