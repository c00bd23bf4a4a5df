//! Post service
//!
//! Feeds, the detail page and the owner-only mutations. Every public read
//! goes through the published filter; only [`PostService::list_all`] skips
//! it, and that one is reserved for staff.

use crate::db::repositories::{
    CategoryRepository, LocationRepository, PostRepository, PostScope, UserRepository,
};
use crate::models::{
    Category, InvalidPage, ListParams, Location, PageRequest, PagedResult, Post, PostInput,
    PostView, User, POST_TITLE_MAX_LEN,
};
use crate::services::policy::{authorize, Action, Actor, Denial, Target};
use crate::services::visibility::can_view;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Missing, or hidden from the requesting actor
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    /// Edit refused; the actor goes back to the post
    #[error("Redirect to post {0}")]
    RedirectToPost(i64),

    #[error("Validation error: {}", .0.join(" "))]
    ValidationError(Vec<String>),

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<Denial> for PostServiceError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::RedirectToPost(id) => PostServiceError::RedirectToPost(id),
            Denial::Forbidden => PostServiceError::Forbidden,
        }
    }
}

/// Categories and locations offered by the post form
#[derive(Debug, Clone, Default)]
pub struct FormChoices {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    users: Arc<dyn UserRepository>,
    paginate_by: u32,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        users: Arc<dyn UserRepository>,
        paginate_by: u32,
    ) -> Self {
        Self {
            posts,
            categories,
            locations,
            users,
            paginate_by: paginate_by.max(1),
        }
    }

    /// Home feed
    pub async fn feed(&self, page: PageRequest) -> Result<PagedResult<PostView>, PostServiceError> {
        self.published_page(PostScope::All, page).await
    }

    /// Feed of one published category.
    ///
    /// A missing or unpublished category is not found, whatever its posts.
    pub async fn category_feed(
        &self,
        slug: &str,
        page: PageRequest,
    ) -> Result<(Category, PagedResult<PostView>), PostServiceError> {
        let category = self
            .categories
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|c| c.is_published)
            .ok_or_else(|| PostServiceError::NotFound(format!("category {}", slug)))?;

        let posts = self.published_page(PostScope::Category(category.id), page).await?;
        Ok((category, posts))
    }

    /// Feed of one author; the owner sees the same published feed as anyone
    pub async fn profile_feed(
        &self,
        username: &str,
        page: PageRequest,
    ) -> Result<(User, PagedResult<PostView>), PostServiceError> {
        let user = self
            .users
            .get_by_username(username)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| PostServiceError::NotFound(format!("user {}", username)))?;

        let posts = self.published_page(PostScope::Author(user.id), page).await?;
        Ok((user, posts))
    }

    /// The post as `viewer` may see it on its detail page
    pub async fn get_for_viewer(&self, id: i64, viewer: &Actor) -> Result<PostView, PostServiceError> {
        let view = self
            .posts
            .get_view(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| post_not_found(id))?;

        if !can_view(viewer, &view, Utc::now()) {
            return Err(post_not_found(id));
        }
        Ok(view)
    }

    /// Create a post owned by `author`
    pub async fn create(&self, author: &User, input: PostInput) -> Result<Post, PostServiceError> {
        let input = self.validate(input).await?;
        let post = self
            .posts
            .create(author.id, &input)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Load a post for its edit form
    pub async fn get_for_edit(&self, id: i64, actor: &Actor) -> Result<Post, PostServiceError> {
        self.owned(id, actor, Action::Edit).await
    }

    /// Overwrite a post's fields on behalf of its author
    pub async fn update(
        &self,
        id: i64,
        actor: &Actor,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        self.owned(id, actor, Action::Edit).await?;
        let input = self.validate(input).await?;

        let post = self
            .posts
            .update(id, &input)
            .await
            .context("Failed to update post")?
            .ok_or_else(|| post_not_found(id))?;

        tracing::info!(post_id = id, "Post updated");
        Ok(post)
    }

    /// Load a post for its delete confirmation page
    pub async fn get_for_delete(&self, id: i64, actor: &Actor) -> Result<Post, PostServiceError> {
        self.owned(id, actor, Action::Delete).await
    }

    /// Delete a post and its comments; returns the removed row
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<Post, PostServiceError> {
        let post = self.owned(id, actor, Action::Delete).await?;
        self.posts.delete(id).await.context("Failed to delete post")?;

        tracing::info!(post_id = id, "Post deleted");
        Ok(post)
    }

    /// Every post regardless of state, for the staff console
    pub async fn list_all(&self, page: PageRequest) -> Result<PagedResult<PostView>, PostServiceError> {
        let total = self.posts.count_all().await.context("Failed to count posts")?;
        let params = page.resolve(total, self.paginate_by)?;
        let items = self
            .posts
            .list_all(&params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Published categories and locations for the form selects
    pub async fn form_choices(&self) -> Result<FormChoices, PostServiceError> {
        Ok(FormChoices {
            categories: self
                .categories
                .list_published()
                .await
                .context("Failed to list categories")?,
            locations: self
                .locations
                .list_published()
                .await
                .context("Failed to list locations")?,
        })
    }

    async fn published_page(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> Result<PagedResult<PostView>, PostServiceError> {
        let now = Utc::now();
        let total = self
            .posts
            .count_published(scope, now)
            .await
            .context("Failed to count posts")?;
        let params: ListParams = page.resolve(total, self.paginate_by)?;
        let items = self
            .posts
            .list_published(scope, now, &params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }

    async fn owned(&self, id: i64, actor: &Actor, action: Action) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| post_not_found(id))?;

        authorize(actor, Target::from(&post), action)?;
        Ok(post)
    }

    async fn validate(&self, input: PostInput) -> Result<PostInput, PostServiceError> {
        let input = PostInput {
            title: input.title.trim().to_string(),
            ..input
        };
        let mut problems = Vec::new();

        if input.title.is_empty() {
            problems.push("Title is required.".to_string());
        } else if input.title.chars().count() > POST_TITLE_MAX_LEN {
            problems.push(format!(
                "Title must be at most {} characters.",
                POST_TITLE_MAX_LEN
            ));
        }
        if input.text.trim().is_empty() {
            problems.push("Text is required.".to_string());
        }
        if let Some(category_id) = input.category_id {
            if self
                .categories
                .get_by_id(category_id)
                .await
                .context("Failed to get category")?
                .is_none()
            {
                problems.push("Select a valid category.".to_string());
            }
        }
        if let Some(location_id) = input.location_id {
            if self
                .locations
                .get_by_id(location_id)
                .await
                .context("Failed to get location")?
                .is_none()
            {
                problems.push("Select a valid location.".to_string());
            }
        }

        if problems.is_empty() {
            Ok(input)
        } else {
            Err(PostServiceError::ValidationError(problems))
        }
    }
}

fn post_not_found(id: i64) -> PostServiceError {
    PostServiceError::NotFound(format!("post {}", id))
}
