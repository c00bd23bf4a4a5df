//! Shared handler helpers
//!
//! Query types, form value holders and the small parsers the page handlers
//! share.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::AppError;
use crate::models::{PageRequest, PagedResult, Post, PostView};

/// Format used by `<input type="datetime-local">`
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// `?page=` query of the feed pages
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Parsed page; garbage is a missing page
    pub fn page_request(&self) -> Result<PageRequest, AppError> {
        Ok(PageRequest::parse(self.page.as_deref())?)
    }
}

/// Insert a feed page as `page_obj` and its `paginator`
pub fn insert_feed(context: &mut tera::Context, feed: &PagedResult<PostView>) {
    context.insert("page_obj", &feed.items);
    context.insert("paginator", &feed.page_info());
}

/// Parse a `datetime-local` value as UTC; blank means now
pub fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Utc::now());
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "Enter a valid date/time.".to_string())
}

/// Parse the `pub_date` field of an edit form
///
/// The form shows minutes only, so a value equal to the formatted `stored`
/// date keeps the stored one as is.
pub fn resolve_pub_date(raw: &str, stored: Option<DateTime<Utc>>) -> Result<DateTime<Utc>, String> {
    match stored {
        Some(stored) if raw.trim() == stored.format(DATETIME_LOCAL_FORMAT).to_string() => Ok(stored),
        _ => parse_pub_date(raw),
    }
}

/// Optional foreign key from a select; blank means none
pub fn parse_optional_id(raw: &str, label: &str) -> Result<Option<i64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| format!("Select a valid {}.", label))
}

/// Values the post form is (re)filled with
#[derive(Debug, Clone, Serialize)]
pub struct PostFormValues {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub is_published: bool,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
}

impl PostFormValues {
    /// Empty form for a new post
    pub fn blank() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            pub_date: Utc::now().format(DATETIME_LOCAL_FORMAT).to_string(),
            is_published: true,
            location_id: None,
            category_id: None,
            image: None,
        }
    }

    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(DATETIME_LOCAL_FORMAT).to_string(),
            is_published: post.is_published,
            location_id: post.location_id,
            category_id: post.category_id,
            image: post.image.clone(),
        }
    }
}

/// Only same-site paths are followed after login
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}
