//! Post model
//!
//! `Post` mirrors the `posts` row. `PostView` is what feeds and the detail
//! page work with: the post joined with its author, category and location,
//! plus the live comment count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum post title length
pub const POST_TITLE_MAX_LEN: usize = 256;

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Title
    pub title: String,
    /// Body text
    pub text: String,
    /// Image path relative to the media root
    pub image: Option<String>,
    /// Scheduled publication time; the post stays hidden until then
    pub pub_date: DateTime<Utc>,
    /// Publication flag
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Owning user
    pub author_id: i64,
    /// Optional geotag
    pub location_id: Option<i64>,
    /// Optional category
    pub category_id: Option<i64>,
}

/// Author fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostAuthor {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Category fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostCategory {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// Location fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostLocation {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

/// A post with everything a listing or detail page needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: PostAuthor,
    pub category: Option<PostCategory>,
    pub location: Option<PostLocation>,
    /// Number of comments, counted when the row was read
    pub comment_count: i64,
}

impl PostView {
    /// Publication flag of the attached category, if any
    pub fn category_published(&self) -> Option<bool> {
        self.category.as_ref().map(|c| c.is_published)
    }
}

/// What to do with the post image on update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageUpdate {
    /// Leave the stored image as it is
    #[default]
    Keep,
    /// Replace it with a newly stored file
    Set(String),
    /// Remove it
    Clear,
}

/// Editable post fields, shared by create and update
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: ImageUpdate,
}

impl PostInput {
    /// Published post with the given title and text, scheduled for now
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            pub_date: Utc::now(),
            is_published: true,
            location_id: None,
            category_id: None,
            image: ImageUpdate::Keep,
        }
    }

    pub fn with_pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
        self.pub_date = pub_date;
        self
    }

    pub fn with_published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_image(mut self, image: ImageUpdate) -> Self {
        self.image = image;
        self
    }

    /// Image path to store for a new post
    pub fn initial_image(&self) -> Option<String> {
        match &self.image {
            ImageUpdate::Set(path) => Some(path.clone()),
            ImageUpdate::Keep | ImageUpdate::Clear => None,
        }
    }

    /// Resolve the stored image after applying this input to `current`
    pub fn resolve_image(&self, current: Option<String>) -> Option<String> {
        match &self.image {
            ImageUpdate::Keep => current,
            ImageUpdate::Set(path) => Some(path.clone()),
            ImageUpdate::Clear => None,
        }
    }
}
